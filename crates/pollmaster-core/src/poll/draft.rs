//! New poll submissions

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PollQuestion, PollSchedule};
use crate::error::{Error, Result};

pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 10;

/// A poll as entered by its host, before any votes exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl PollDraft {
    /// Non-blank option labels, trimmed, in entry order.
    pub fn filled_options(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Please enter a poll title.".to_string()));
        }

        let options = self.filled_options();
        if options.len() < MIN_POLL_OPTIONS {
            return Err(Error::Validation(
                "Please provide at least two non-empty options.".to_string(),
            ));
        }
        if options.len() > MAX_POLL_OPTIONS {
            return Err(Error::Validation(format!(
                "Maximum {MAX_POLL_OPTIONS} options allowed."
            )));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = options.iter().find(|option| !seen.insert(option.as_str())) {
            return Err(Error::Validation(format!(
                "Option '{duplicate}' is listed more than once."
            )));
        }

        if self.starts_at <= now {
            return Err(Error::Validation(
                "Start time must be in the future.".to_string(),
            ));
        }
        if self.ends_at <= self.starts_at {
            return Err(Error::Validation(
                "End time must be after start time.".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_question(self, id: String, now: DateTime<Utc>) -> Result<PollQuestion> {
        self.validate(now)?;
        let options = self.filled_options();
        let schedule = PollSchedule {
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        };
        Ok(PollQuestion::new(
            id,
            self.title,
            options.into_iter().map(|label| (label, 0)),
        )?
        .with_description(self.description)
        .with_schedule(schedule))
    }
}
