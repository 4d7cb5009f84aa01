//! pollmaster-core - Core library for PollMaster
//!
//! This crate contains the poll tally engine, the client session store, and
//! the role-gated collection store shared by every PollMaster client.

pub mod api;
pub mod auth;
pub mod collection;
pub mod config;
pub mod error;
pub mod models;
pub mod poll;
pub mod session;
pub mod storage;
pub mod util;

#[cfg(test)]
mod test_server;

pub use collection::{CollectionBackend, CollectionStore, WritePolicy, WriteRule};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{Article, CollectionRecord, Pet, PetFood, Role, User};
pub use poll::{PollBoard, PollQuestion, RoundingPolicy, Tally};
pub use session::{SessionState, SessionStore, SignUpOutcome};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
