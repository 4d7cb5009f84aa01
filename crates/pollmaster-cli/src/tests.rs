use pollmaster_core::{CollectionBackend, Error as CoreError, Pet, Tally};
use pretty_assertions::assert_eq;

use crate::cli::{ArticleCommands, CompletionShell, PollCommands, RoundingArg, RouteStyleArg};
use crate::commands::collection::{backend_for, run_articles};
use crate::commands::common::{format_tally_lines, parse_time, resolve_profile, CliPaths};
use crate::commands::completions::render_completions;
use crate::commands::config::{run_config_init, ProfileUpdate};
use crate::commands::poll::{open_board, run_poll};
use crate::config_profiles::{BackendMode, RouteStyle};
use crate::error::CliError;

const PROFILE: &str = "test";

fn temp_paths() -> (tempfile::TempDir, CliPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = CliPaths {
        config_path: dir.path().join("config").join("cli-config.json"),
        data_dir: dir.path().join("data"),
    };
    (dir, paths)
}

fn vote(paths: &CliPaths, id: &str, option: &str) -> Result<(), CliError> {
    run_poll(
        PollCommands::Vote {
            id: id.to_string(),
            option: option.to_string(),
        },
        paths,
        Some(PROFILE),
    )
}

#[test]
fn config_init_saves_and_activates_profile() {
    let (_dir, paths) = temp_paths();
    let update = ProfileUpdate {
        api_base_url: Some("http://localhost:5000".to_string()),
        routes: Some(RouteStyleArg::Flat),
        rounding: Some(RoundingArg::LargestRemainder),
        ..ProfileUpdate::default()
    };

    let name = run_config_init(&paths, Some(PROFILE), update, false).unwrap();

    assert_eq!(name, PROFILE);
    let config = paths.load_config().unwrap();
    assert_eq!(config.active_profile.as_deref(), Some(PROFILE));
    let profile = config.profile(PROFILE).unwrap();
    assert_eq!(profile.routes, Some(RouteStyle::Flat));
    assert_eq!(
        profile.client_config(PROFILE).unwrap().routes.sign_in,
        "/login"
    );
}

#[test]
fn config_init_keeps_existing_values() {
    let (_dir, paths) = temp_paths();
    run_config_init(
        &paths,
        Some(PROFILE),
        ProfileUpdate {
            api_base_url: Some("http://localhost:5000".to_string()),
            timeout_secs: Some(4),
            ..ProfileUpdate::default()
        },
        false,
    )
    .unwrap();
    run_config_init(
        &paths,
        Some(PROFILE),
        ProfileUpdate {
            admin_key: Some("enroll".to_string()),
            ..ProfileUpdate::default()
        },
        true,
    )
    .unwrap();

    let profile = paths.load_config().unwrap().profile(PROFILE).cloned().unwrap();
    assert_eq!(profile.api_base_url.as_deref(), Some("http://localhost:5000"));
    assert_eq!(profile.request_timeout_secs, Some(4));
    assert_eq!(profile.admin_key.as_deref(), Some("enroll"));
    assert_eq!(profile.backend(), BackendMode::Remote);
}

#[test]
fn config_init_rejects_non_http_urls() {
    let (_dir, paths) = temp_paths();
    let error = run_config_init(
        &paths,
        Some(PROFILE),
        ProfileUpdate {
            api_base_url: Some("localhost:5000".to_string()),
            ..ProfileUpdate::default()
        },
        false,
    )
    .unwrap_err();
    assert!(matches!(error, CliError::Config(_)));
}

#[test]
fn unconfigured_profile_falls_back_to_defaults() {
    let (_dir, paths) = temp_paths();
    let resolved = resolve_profile(&paths, Some(PROFILE)).unwrap();
    assert_eq!(resolved.name, PROFILE);
    assert!(resolved.profile.api_base_url.is_none());
}

#[test]
fn votes_persist_between_invocations() {
    let (_dir, paths) = temp_paths();

    vote(&paths, "project", "Library expansion").unwrap();
    vote(&paths, "project", "Library expansion").unwrap();

    let store = paths.open_store(PROFILE).unwrap();
    let profile = resolve_profile(&paths, Some(PROFILE)).unwrap().profile;
    let board = open_board(&store, &profile).unwrap();
    let question = board.question("project").unwrap();
    assert_eq!(question.total_votes(), 102);
    let library = question
        .options()
        .iter()
        .find(|option| option.label == "Library expansion")
        .unwrap();
    assert_eq!(library.votes, 30);
}

#[test]
fn unknown_option_leaves_counts_alone() {
    let (_dir, paths) = temp_paths();

    let error = vote(&paths, "frequency", "Daily").unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(CoreError::InvalidOption { .. })
    ));

    let error = vote(&paths, "no-such-poll", "Weekly").unwrap_err();
    assert!(matches!(error, CliError::Core(CoreError::NotFound(_))));
}

#[test]
fn created_poll_is_listed_but_closed_until_it_starts() {
    let (_dir, paths) = temp_paths();
    run_poll(
        PollCommands::Create {
            title: "Best snack?".to_string(),
            description: "For the spring picnic".to_string(),
            options: vec!["Chips".to_string(), "Fruit".to_string()],
            starts_at: "2998-01-01T00:00:00Z".to_string(),
            ends_at: "2999-01-01T00:00:00Z".to_string(),
        },
        &paths,
        Some(PROFILE),
    )
    .unwrap();

    let store = paths.open_store(PROFILE).unwrap();
    let profile = resolve_profile(&paths, Some(PROFILE)).unwrap().profile;
    let board = open_board(&store, &profile).unwrap();
    let ids = board.ids().unwrap();
    assert_eq!(ids.len(), 4);
    let created = board.question(&ids[3]).unwrap();
    assert_eq!(created.prompt(), "Best snack?");
    assert_eq!(created.description(), "For the spring picnic");
    assert_eq!(created.total_votes(), 0);

    let error = vote(&paths, &ids[3], "Fruit").unwrap_err();
    assert!(matches!(error, CliError::Core(CoreError::PollClosed(_))));
}

#[test]
fn invalid_poll_times_are_reported() {
    assert!(parse_time("2026-05-01T09:00:00Z").is_ok());
    assert!(matches!(
        parse_time("tomorrow"),
        Err(CliError::InvalidTime(value)) if value == "tomorrow"
    ));
}

#[test]
fn tally_lines_align_labels() {
    let lines = format_tally_lines(&[
        Tally {
            label: "A".to_string(),
            votes: 2,
            percentage: 67,
        },
        Tally {
            label: "Longer".to_string(),
            votes: 1,
            percentage: 33,
        },
    ]);
    assert_eq!(
        lines,
        vec![
            "  A        67%  (2 votes)".to_string(),
            "  Longer   33%  (1 vote)".to_string(),
        ]
    );
}

#[tokio::test]
async fn empty_article_patch_is_rejected_before_any_request() {
    let (_dir, paths) = temp_paths();
    let error = run_articles(
        ArticleCommands::Update {
            id: "a1".to_string(),
            title: None,
            summary: None,
            body: None,
            date: None,
        },
        &paths,
        Some(PROFILE),
    )
    .await
    .unwrap_err();
    assert!(matches!(error, CliError::EmptyPatch));
}

#[tokio::test]
async fn collection_commands_require_a_configured_profile() {
    let (_dir, paths) = temp_paths();
    let error = run_articles(ArticleCommands::List { json: true }, &paths, Some(PROFILE))
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::ProfileNotConfigured(name) if name == PROFILE));
}

#[test]
fn backend_mode_maps_to_collection_prefix() {
    assert_eq!(
        backend_for::<Pet>(BackendMode::Remote),
        CollectionBackend::remote("/pets")
    );
    assert_eq!(backend_for::<Pet>(BackendMode::Local), CollectionBackend::Local);
}

#[test]
fn bash_completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("pollmaster"));
}
