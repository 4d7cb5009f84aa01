//! PollMaster CLI - community polls and authenticated content from the terminal
//!
//! Votes are tallied locally per profile; auth and collection commands talk to
//! the profile's backend through the shared session store.

mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands};
use commands::auth_cmd::run_auth;
use commands::collection::{run_articles, run_pet_foods, run_pets};
use commands::common::CliPaths;
use commands::completions::run_completions;
use commands::config::run_config;
use commands::poll::run_poll;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "pollmaster=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = CliPaths::default_locations();
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Poll { command }) => run_poll(command, &paths, profile)?,
        Some(Commands::Auth { command }) => run_auth(command, &paths, profile).await?,
        Some(Commands::Articles { command }) => run_articles(command, &paths, profile).await?,
        Some(Commands::PetFoods { command }) => run_pet_foods(command, &paths, profile).await?,
        Some(Commands::Pets { command }) => run_pets(command, &paths, profile).await?,
        Some(Commands::Config { command }) => run_config(command, &paths, profile)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
