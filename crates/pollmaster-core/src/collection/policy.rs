//! Composable write predicates for collection mutations.

use serde::{Deserialize, Serialize};

use crate::models::User;

/// A single predicate. A [`WritePolicy`] passes when any of its rules does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteRule {
    /// The signed-in user holds the admin role
    AdminRole,
    /// The signed-in user posted the item (any signed-in user may create)
    Owner,
}

/// What the caller is trying to do to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction<'a> {
    Create,
    Modify { posted_by: &'a str },
}

impl WriteRule {
    pub fn permits(self, user: &User, action: WriteAction<'_>) -> bool {
        match self {
            Self::AdminRole => user.is_admin(),
            Self::Owner => match action {
                WriteAction::Create => true,
                WriteAction::Modify { posted_by } => user.is_identified_by(posted_by),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WritePolicy {
    rules: Vec<WriteRule>,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self::admin_only()
    }
}

impl WritePolicy {
    pub fn new(rules: impl IntoIterator<Item = WriteRule>) -> Self {
        let mut collected: Vec<WriteRule> = Vec::new();
        for rule in rules {
            if !collected.contains(&rule) {
                collected.push(rule);
            }
        }
        Self { rules: collected }
    }

    pub fn admin_only() -> Self {
        Self::new([WriteRule::AdminRole])
    }

    pub fn owner_or_admin() -> Self {
        Self::new([WriteRule::AdminRole, WriteRule::Owner])
    }

    pub fn rules(&self) -> &[WriteRule] {
        &self.rules
    }

    /// Signed-out callers are always refused.
    pub fn permits(&self, user: Option<&User>, action: WriteAction<'_>) -> bool {
        user.is_some_and(|user| self.rules.iter().any(|rule| rule.permits(user, action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            name: "Test".to_string(),
            email: format!("{id}@example.com"),
            role,
            verified: true,
        }
    }

    #[test]
    fn admin_only_refuses_regular_users() {
        let policy = WritePolicy::admin_only();
        let member = user("member", Role::User);
        let admin = user("boss", Role::Admin);

        assert!(!policy.permits(Some(&member), WriteAction::Create));
        assert!(policy.permits(Some(&admin), WriteAction::Create));
        assert!(!policy.permits(None, WriteAction::Create));
    }

    #[test]
    fn owner_rule_limits_changes_to_creator() {
        let policy = WritePolicy::owner_or_admin();
        let author = user("author", Role::User);

        assert!(policy.permits(
            Some(&author),
            WriteAction::Modify {
                posted_by: "author"
            }
        ));
        assert!(policy.permits(
            Some(&author),
            WriteAction::Modify {
                posted_by: "author@example.com"
            }
        ));
        assert!(!policy.permits(
            Some(&author),
            WriteAction::Modify {
                posted_by: "someone-else"
            }
        ));
    }

    #[test]
    fn duplicate_rules_collapse() {
        let policy = WritePolicy::new([WriteRule::Owner, WriteRule::Owner]);
        assert_eq!(policy.rules(), &[WriteRule::Owner]);
    }

    #[test]
    fn empty_policy_refuses_everyone() {
        let policy = WritePolicy::new([]);
        let admin = user("boss", Role::Admin);
        assert!(!policy.permits(Some(&admin), WriteAction::Create));
    }
}
