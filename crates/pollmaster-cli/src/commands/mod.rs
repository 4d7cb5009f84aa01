pub mod auth_cmd;
pub mod collection;
pub mod common;
pub mod completions;
pub mod config;
pub mod poll;
