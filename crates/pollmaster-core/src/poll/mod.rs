//! Poll tally engine
//!
//! A [`PollQuestion`] stores raw vote counts only. Percentages are derived on
//! demand from the current total, so a persisted question never drifts from
//! its tallies.

mod board;
mod draft;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use board::PollBoard;
pub use draft::{PollDraft, MAX_POLL_OPTIONS, MIN_POLL_OPTIONS};

/// How percentages are rounded when rendering tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round half up per option; the sum may be 99 or 101
    #[default]
    Independent,
    /// Hamilton apportionment; the sum is exactly 100 whenever votes exist
    LargestRemainder,
}

/// A single labeled option and its vote count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub label: String,
    pub votes: u64,
}

/// Window during which a question accepts votes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSchedule {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl PollSchedule {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

/// Per-option snapshot shown to voters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub label: String,
    pub votes: u64,
    pub percentage: u8,
}

/// A votable question with unique option labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct PollQuestion {
    id: String,
    prompt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    options: Vec<PollOption>,
    total_votes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule: Option<PollSchedule>,
}

#[derive(Deserialize)]
struct QuestionRecord {
    id: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    description: String,
    options: Vec<PollOption>,
    #[serde(default)]
    schedule: Option<PollSchedule>,
}

impl TryFrom<QuestionRecord> for PollQuestion {
    type Error = Error;

    fn try_from(record: QuestionRecord) -> Result<Self> {
        let question = Self::new(
            record.id,
            record.prompt,
            record
                .options
                .into_iter()
                .map(|option| (option.label, option.votes)),
        )?;
        Ok(question
            .with_description(record.description)
            .with_schedule_opt(record.schedule))
    }
}

impl PollQuestion {
    /// Create a question seeded with initial counts.
    ///
    /// Labels are trimmed and must be non-empty and unique.
    pub fn new<L: Into<String>>(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: impl IntoIterator<Item = (L, u64)>,
    ) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(Error::Validation("Poll id must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut parsed = Vec::new();
        for (label, votes) in options {
            let label = label.into().trim().to_string();
            if label.is_empty() {
                return Err(Error::Validation(format!(
                    "Poll '{id}' has an empty option label"
                )));
            }
            if !seen.insert(label.clone()) {
                return Err(Error::Validation(format!(
                    "Poll '{id}' repeats option '{label}'"
                )));
            }
            parsed.push(PollOption { label, votes });
        }
        if parsed.is_empty() {
            return Err(Error::Validation(format!("Poll '{id}' has no options")));
        }

        let total_votes = parsed.iter().map(|option| option.votes).sum();
        Ok(Self {
            id,
            prompt: prompt.into().trim().to_string(),
            description: String::new(),
            options: parsed,
            total_votes,
            schedule: None,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_string();
        self
    }

    #[must_use]
    pub const fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    const fn with_schedule_opt(mut self, schedule: Option<PollSchedule>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    pub const fn total_votes(&self) -> u64 {
        self.total_votes
    }

    pub const fn schedule(&self) -> Option<&PollSchedule> {
        self.schedule.as_ref()
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.schedule.is_none_or(|schedule| schedule.is_open_at(now))
    }

    /// Apply one vote and return the recomputed tallies.
    ///
    /// An unknown label fails with [`Error::InvalidOption`] and leaves the
    /// question untouched.
    pub fn vote(&mut self, label: &str) -> Result<Vec<Tally>> {
        self.record_vote(label)?;
        Ok(self.tallies(RoundingPolicy::Independent))
    }

    pub(crate) fn record_vote(&mut self, label: &str) -> Result<()> {
        let label = label.trim();
        let option = self
            .options
            .iter_mut()
            .find(|option| option.label == label)
            .ok_or_else(|| Error::InvalidOption {
                poll: self.id.clone(),
                option: label.to_string(),
            })?;
        option.votes = option.votes.saturating_add(1);
        self.total_votes = self.total_votes.saturating_add(1);
        Ok(())
    }

    /// Percentage of the total held by `label`, or `None` for unknown labels.
    pub fn percentage(&self, label: &str) -> Option<u8> {
        self.options
            .iter()
            .find(|option| option.label == label)
            .map(|option| rounded_percentage(option.votes, self.total_votes))
    }

    pub fn tallies(&self, policy: RoundingPolicy) -> Vec<Tally> {
        let percentages = match policy {
            RoundingPolicy::Independent => self
                .options
                .iter()
                .map(|option| rounded_percentage(option.votes, self.total_votes))
                .collect(),
            RoundingPolicy::LargestRemainder => largest_remainder(&self.options, self.total_votes),
        };

        self.options
            .iter()
            .zip(percentages)
            .map(|(option, percentage)| Tally {
                label: option.label.clone(),
                votes: option.votes,
                percentage,
            })
            .collect()
    }
}

/// `round(votes / total * 100)` with halves rounded up; 0 when nobody voted.
pub fn rounded_percentage(votes: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let votes = u128::from(votes);
    let total = u128::from(total);
    let rounded = (votes * 200 + total) / (total * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

fn largest_remainder(options: &[PollOption], total: u64) -> Vec<u8> {
    if total == 0 {
        return vec![0; options.len()];
    }
    let total = u128::from(total);
    let mut floors = Vec::with_capacity(options.len());
    let mut remainders = Vec::with_capacity(options.len());
    for (index, option) in options.iter().enumerate() {
        let scaled = u128::from(option.votes) * 100;
        floors.push(scaled / total);
        remainders.push((index, scaled % total));
    }

    let assigned: u128 = floors.iter().sum();
    let leftover = usize::try_from(100_u128.saturating_sub(assigned)).unwrap_or(0);
    // Stable sort keeps option order as the tie breaker.
    remainders.sort_by(|left, right| right.1.cmp(&left.1));
    for (index, _) in remainders.into_iter().take(leftover) {
        floors[index] += 1;
    }

    floors
        .into_iter()
        .map(|value| u8::try_from(value.min(100)).unwrap_or(100))
        .collect()
}
