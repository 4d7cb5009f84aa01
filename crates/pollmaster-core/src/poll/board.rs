//! Id-keyed table of poll questions

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};

use super::{PollDraft, PollQuestion, RoundingPolicy, Tally};
use crate::error::{Error, Result};
use crate::storage::{keys, load_json, save_json, KeyValueStore};

#[derive(Default)]
struct BoardEntries {
    order: Vec<String>,
    by_id: HashMap<String, Arc<Mutex<PollQuestion>>>,
}

/// Every votable question, looked up by id.
///
/// Each question has its own lock, so concurrent votes on one question are
/// applied one after another while votes on different questions do not
/// contend.
pub struct PollBoard {
    entries: RwLock<BoardEntries>,
    rounding: RoundingPolicy,
}

impl Default for PollBoard {
    fn default() -> Self {
        Self::new(RoundingPolicy::default())
    }
}

impl PollBoard {
    pub fn new(rounding: RoundingPolicy) -> Self {
        Self {
            entries: RwLock::new(BoardEntries::default()),
            rounding,
        }
    }

    pub fn from_questions(
        questions: impl IntoIterator<Item = PollQuestion>,
        rounding: RoundingPolicy,
    ) -> Result<Self> {
        let board = Self::new(rounding);
        for question in questions {
            board.insert(question)?;
        }
        Ok(board)
    }

    /// The three community polls the survey screen starts with.
    pub fn community() -> Result<Self> {
        let seeds = [
            (
                "communication",
                "Preferred method of community communication?",
                vec![
                    ("Social media updates", 30),
                    ("Newsletters", 25),
                    ("Mobile app notifications", 20),
                    ("SMS/text messages", 15),
                ],
            ),
            (
                "project",
                "Which community improvement project should we prioritize?",
                vec![
                    ("New community park", 42),
                    ("Library expansion", 28),
                    ("Road improvements", 20),
                    ("Community center renovation", 10),
                ],
            ),
            (
                "frequency",
                "How often would you like community events?",
                vec![
                    ("Weekly", 18),
                    ("Monthly", 45),
                    ("Quarterly", 27),
                    ("Annually", 10),
                ],
            ),
        ];

        let board = Self::default();
        for (id, prompt, options) in seeds {
            board.insert(PollQuestion::new(id, prompt, options)?)?;
        }
        Ok(board)
    }

    /// Restore the board persisted under the `polls` key, seeding with
    /// `fallback` when nothing was saved yet.
    pub fn load_from(
        store: &impl KeyValueStore,
        rounding: RoundingPolicy,
        fallback: impl FnOnce() -> Result<Self>,
    ) -> Result<Self> {
        match load_json::<Vec<PollQuestion>>(store, keys::POLLS)? {
            Some(questions) => Self::from_questions(questions, rounding),
            None => fallback(),
        }
    }

    /// Persist every question's raw counts.
    pub fn save_to(&self, store: &impl KeyValueStore) -> Result<()> {
        save_json(store, keys::POLLS, &self.snapshot()?)
    }

    #[must_use]
    pub fn with_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    pub const fn rounding(&self) -> RoundingPolicy {
        self.rounding
    }

    pub fn insert(&self, question: PollQuestion) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|error| Error::Storage(error.to_string()))?;
        let id = question.id().to_string();
        if entries.by_id.contains_key(&id) {
            return Err(Error::Validation(format!("Poll '{id}' already exists")));
        }
        entries.order.push(id.clone());
        entries.by_id.insert(id, Arc::new(Mutex::new(question)));
        Ok(())
    }

    /// Validate `draft` and add it as a zero-vote question. Returns the new id.
    pub fn create(&self, draft: PollDraft, now: DateTime<Utc>) -> Result<String> {
        let id = uuid::Uuid::now_v7().to_string();
        let question = draft.into_question(id.clone(), now)?;
        self.insert(question)?;
        tracing::info!("Created poll {}", id);
        Ok(id)
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|error| Error::Storage(error.to_string()))?;
        Ok(entries.order.clone())
    }

    pub fn question(&self, poll_id: &str) -> Result<PollQuestion> {
        let slot = self.slot(poll_id)?;
        let question = lock_question(&slot)?;
        Ok(question.clone())
    }

    pub fn tallies(&self, poll_id: &str) -> Result<Vec<Tally>> {
        let slot = self.slot(poll_id)?;
        let question = lock_question(&slot)?;
        Ok(question.tallies(self.rounding))
    }

    pub fn vote(&self, poll_id: &str, label: &str) -> Result<Vec<Tally>> {
        self.vote_at(poll_id, label, Utc::now())
    }

    /// Apply one vote while holding the question's lock.
    pub fn vote_at(&self, poll_id: &str, label: &str, now: DateTime<Utc>) -> Result<Vec<Tally>> {
        let slot = self.slot(poll_id)?;
        let mut question = lock_question(&slot)?;
        if !question.is_open_at(now) {
            return Err(Error::PollClosed(poll_id.to_string()));
        }
        question.record_vote(label)?;
        tracing::debug!(
            "Vote recorded on {} for '{}' (total {})",
            poll_id,
            label.trim(),
            question.total_votes()
        );
        Ok(question.tallies(self.rounding))
    }

    /// Copies of every question in board order.
    pub fn snapshot(&self) -> Result<Vec<PollQuestion>> {
        let entries = self
            .entries
            .read()
            .map_err(|error| Error::Storage(error.to_string()))?;
        entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id))
            .map(|slot| lock_question(slot).map(|question| question.clone()))
            .collect()
    }

    fn slot(&self, poll_id: &str) -> Result<Arc<Mutex<PollQuestion>>> {
        let entries = self
            .entries
            .read()
            .map_err(|error| Error::Storage(error.to_string()))?;
        entries
            .by_id
            .get(poll_id.trim())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("poll '{}'", poll_id.trim())))
    }
}

fn lock_question(slot: &Mutex<PollQuestion>) -> Result<MutexGuard<'_, PollQuestion>> {
    slot.lock()
        .map_err(|error| Error::Storage(format!("poll lock poisoned: {error}")))
}
