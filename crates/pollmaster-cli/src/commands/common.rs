use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pollmaster_core::{Error as CoreError, JsonFileStore, PollQuestion, SessionStore, Tally};
use serde::Serialize;

use crate::config_profiles::{
    default_config_path, default_data_dir, CliProfile, CliProfilesConfig,
};
use crate::error::CliError;

/// Where the CLI keeps its profile file and per-profile stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliPaths {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
}

impl CliPaths {
    pub fn default_locations() -> Self {
        Self {
            config_path: default_config_path(),
            data_dir: default_data_dir(),
        }
    }

    pub fn load_config(&self) -> Result<CliProfilesConfig, CliError> {
        CliProfilesConfig::load_from_path(&self.config_path).map_err(CliError::Config)
    }

    pub fn store_path(&self, profile_name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", sanitize_file_stem(profile_name)))
    }

    pub fn open_store(&self, profile_name: &str) -> Result<JsonFileStore, CliError> {
        Ok(JsonFileStore::open(self.store_path(profile_name))?)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub name: String,
    pub profile: CliProfile,
}

/// Resolve the profile; an unconfigured one falls back to defaults.
pub fn resolve_profile(paths: &CliPaths, explicit: Option<&str>) -> Result<ResolvedProfile, CliError> {
    let config = paths.load_config()?;
    let name = config.resolve_profile_name(explicit);
    let profile = config.profile(&name).cloned().unwrap_or_default();
    Ok(ResolvedProfile { name, profile })
}

/// Build the profile's session and resume whatever was persisted.
///
/// Offline, the stored token is kept and the command carries on signed out;
/// a rejected token has already been cleared by the session store.
pub async fn open_session(
    paths: &CliPaths,
    explicit: Option<&str>,
) -> Result<(ResolvedProfile, Arc<SessionStore<JsonFileStore>>), CliError> {
    let resolved = resolve_profile(paths, explicit)?;
    let config = resolved.profile.client_config(&resolved.name)?;
    let store = paths.open_store(&resolved.name)?;
    let session = Arc::new(SessionStore::new(config, store)?);

    match session.init().await {
        Ok(state) => tracing::debug!("Profile '{}' session: {:?}", resolved.name, state),
        Err(CoreError::Unauthorized(_)) => {
            eprintln!("Stored session for '{}' expired; sign in again.", resolved.name);
        }
        Err(error @ (CoreError::Network(_) | CoreError::Timeout(_))) => {
            tracing::warn!("Could not reach backend, continuing offline: {}", error);
        }
        Err(error) => return Err(error.into()),
    }
    Ok((resolved, session))
}

pub fn parse_time(value: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| CliError::InvalidTime(value.trim().to_string()))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Aligned `  Label  67%  (2 votes)` result lines.
pub fn format_tally_lines(tallies: &[Tally]) -> Vec<String> {
    let width = tallies
        .iter()
        .map(|tally| tally.label.chars().count())
        .max()
        .unwrap_or(0);
    tallies
        .iter()
        .map(|tally| {
            let noun = if tally.votes == 1 { "vote" } else { "votes" };
            format!(
                "  {:<width$}  {:>3}%  ({} {noun})",
                tally.label, tally.percentage, tally.votes
            )
        })
        .collect()
}

pub fn format_question_header(question: &PollQuestion) -> String {
    let status = match question.schedule() {
        Some(schedule) if !schedule.is_open_at(Utc::now()) => " [closed]",
        _ => "",
    };
    format!(
        "{} - {} ({} votes){status}",
        question.id(),
        question.prompt(),
        question.total_votes()
    )
}

fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "default".to_string()
    } else {
        stem
    }
}
