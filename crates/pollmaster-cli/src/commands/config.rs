use std::env;

use pollmaster_core::util::is_http_url;
use pollmaster_core::RoundingPolicy;

use crate::cli::{BackendArg, ConfigCommands, RouteStyleArg, RoundingArg, WritePolicyArg};
use crate::commands::common::CliPaths;
use crate::config_profiles::{normalize_text_option, BackendMode, PolicyName, RouteStyle};
use crate::error::CliError;

pub const API_BASE_URL_ENV_VAR: &str = "POLLMASTER_API_BASE_URL";

/// Values passed to `config init`; `None` keeps what the profile had.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub api_base_url: Option<String>,
    pub routes: Option<RouteStyleArg>,
    pub timeout_secs: Option<u64>,
    pub write_policy: Option<WritePolicyArg>,
    pub backend: Option<BackendArg>,
    pub rounding: Option<RoundingArg>,
    pub admin_key: Option<String>,
}

pub fn run_config(
    command: ConfigCommands,
    paths: &CliPaths,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            routes,
            timeout_secs,
            write_policy,
            backend,
            rounding,
            admin_key,
            no_activate,
        } => {
            let update = ProfileUpdate {
                api_base_url,
                routes,
                timeout_secs,
                write_policy,
                backend,
                rounding,
                admin_key,
            };
            let name = run_config_init(
                paths,
                profile.as_deref().or(global_profile),
                update,
                no_activate,
            )?;
            println!(
                "Saved profile '{name}' to {}",
                paths.config_path.display()
            );
            Ok(())
        }
        ConfigCommands::Show => run_config_show(paths, global_profile),
    }
}

/// Merge `update` into the named profile and save. Returns the profile name.
pub fn run_config_init(
    paths: &CliPaths,
    profile_name: Option<&str>,
    update: ProfileUpdate,
    no_activate: bool,
) -> Result<String, CliError> {
    let mut config = paths.load_config()?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let api_base_url = normalize_text_option(update.api_base_url)
        .or_else(|| normalize_text_option(env::var(API_BASE_URL_ENV_VAR).ok()))
        .or_else(|| existing.api_base_url())
        .ok_or_else(|| {
            CliError::Config(format!(
                "Missing API base URL. Pass --api-base-url or set {API_BASE_URL_ENV_VAR}."
            ))
        })?;
    if !is_http_url(&api_base_url) {
        return Err(CliError::Config(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    if update.timeout_secs == Some(0) {
        return Err(CliError::Config(
            "Timeout must be at least one second".to_string(),
        ));
    }

    let profile = config.profile_mut_or_default(&profile_name);
    profile.api_base_url = Some(api_base_url);
    if let Some(routes) = update.routes {
        profile.routes = Some(match routes {
            RouteStyleArg::Nested => RouteStyle::Nested,
            RouteStyleArg::Flat => RouteStyle::Flat,
        });
    }
    if let Some(secs) = update.timeout_secs {
        profile.request_timeout_secs = Some(secs);
    }
    if let Some(policy) = update.write_policy {
        profile.write_policy = Some(match policy {
            WritePolicyArg::Admin => PolicyName::Admin,
            WritePolicyArg::Owner => PolicyName::Owner,
        });
    }
    if let Some(backend) = update.backend {
        profile.backend = Some(match backend {
            BackendArg::Remote => BackendMode::Remote,
            BackendArg::Local => BackendMode::Local,
        });
    }
    if let Some(rounding) = update.rounding {
        profile.rounding = Some(match rounding {
            RoundingArg::Independent => RoundingPolicy::Independent,
            RoundingArg::LargestRemainder => RoundingPolicy::LargestRemainder,
        });
    }
    if let Some(key) = normalize_text_option(update.admin_key) {
        profile.admin_key = Some(key);
    }

    if !no_activate || config.active_profile.is_none() {
        config.active_profile = Some(profile_name.clone());
    }
    config
        .save_to_path(&paths.config_path)
        .map_err(CliError::Config)?;
    tracing::info!("Saved CLI profile '{}'", profile_name);
    Ok(profile_name)
}

fn run_config_show(paths: &CliPaths, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = paths.load_config()?;
    let profile_name = config.resolve_profile_name(global_profile);
    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured.");
        return Ok(());
    };

    let client = profile.client_config(&profile_name)?;
    println!("Profile: {profile_name}");
    println!("API base URL: {}", client.api_base_url);
    println!("Sign-in route: {}", client.routes.sign_in);
    println!("Request timeout: {}s", client.request_timeout_secs);
    println!("Write policy: {:?}", client.write_policy.rules());
    println!("Collections: {:?}", profile.backend());
    println!("Rounding: {:?}", profile.rounding());
    println!(
        "Admin key: {}",
        if client.admin_key.is_some() { "set" } else { "not set" }
    );
    println!("Store: {}", paths.store_path(&profile_name).display());
    Ok(())
}
