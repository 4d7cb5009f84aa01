use chrono::Utc;
use pollmaster_core::poll::PollDraft;
use pollmaster_core::{JsonFileStore, PollBoard, PollQuestion, Tally};
use serde::Serialize;

use crate::cli::PollCommands;
use crate::commands::common::{
    format_question_header, format_tally_lines, parse_time, print_json, resolve_profile, CliPaths,
};
use crate::config_profiles::CliProfile;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PollResult {
    pub id: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub total_votes: u64,
    pub tallies: Vec<Tally>,
}

impl PollResult {
    fn new(question: &PollQuestion, board: &PollBoard) -> Self {
        Self {
            id: question.id().to_string(),
            prompt: question.prompt().to_string(),
            description: question.description().to_string(),
            total_votes: question.total_votes(),
            tallies: question.tallies(board.rounding()),
        }
    }
}

pub fn run_poll(
    command: PollCommands,
    paths: &CliPaths,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let resolved = resolve_profile(paths, global_profile)?;
    let store = paths.open_store(&resolved.name)?;
    let board = open_board(&store, &resolved.profile)?;

    match command {
        PollCommands::List { json } => {
            let results = poll_results(&board)?;
            if json {
                return print_json(&results);
            }
            for question in board.snapshot()? {
                println!("{}", format_question_header(&question));
                for line in format_tally_lines(&question.tallies(board.rounding())) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        PollCommands::Show { id, json } => {
            let question = board.question(&id)?;
            if json {
                return print_json(&PollResult::new(&question, &board));
            }
            println!("{}", format_question_header(&question));
            if !question.description().is_empty() {
                println!("  {}", question.description());
            }
            for line in format_tally_lines(&question.tallies(board.rounding())) {
                println!("{line}");
            }
            Ok(())
        }
        PollCommands::Vote { id, option } => {
            let tallies = board.vote(&id, &option)?;
            board.save_to(&store)?;
            println!("Vote recorded on '{id}'");
            for line in format_tally_lines(&tallies) {
                println!("{line}");
            }
            Ok(())
        }
        PollCommands::Create {
            title,
            description,
            options,
            starts_at,
            ends_at,
        } => {
            let draft = PollDraft {
                title,
                description,
                options,
                starts_at: parse_time(&starts_at)?,
                ends_at: parse_time(&ends_at)?,
            };
            let id = board.create(draft, Utc::now())?;
            board.save_to(&store)?;
            println!("Created poll {id}");
            Ok(())
        }
    }
}

pub fn open_board(
    store: &JsonFileStore,
    profile: &CliProfile,
) -> Result<PollBoard, CliError> {
    let rounding = profile.rounding();
    Ok(PollBoard::load_from(store, rounding, || {
        Ok(PollBoard::community()?.with_rounding(rounding))
    })?)
}

pub fn poll_results(board: &PollBoard) -> Result<Vec<PollResult>, CliError> {
    Ok(board
        .snapshot()?
        .into_iter()
        .map(|question| PollResult::new(&question, board))
        .collect())
}
