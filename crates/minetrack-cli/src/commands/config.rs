use std::env;

use minetrack_core::config::{normalize_base_url, API_BASE_URL_ENV, PAGE_SIZE_ENV};

use crate::cli::ConfigCommands;
use crate::commands::common::REPORTER_ID_ENV;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            reporter_id,
            page_size,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            api_base_url,
            reporter_id,
            page_size,
            no_activate,
        ),
    }
}

/// Merge explicit flags over environment over the existing profile, then save.
#[allow(clippy::needless_pass_by_value)]
pub fn run_config_init(
    profile_name: Option<&str>,
    api_base_url: Option<String>,
    reporter_id: Option<String>,
    page_size: Option<usize>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged_api_base_url = normalize_text_option(api_base_url)
        .or_else(|| normalize_text_option(env::var(API_BASE_URL_ENV).ok()))
        .or_else(|| existing_profile.api_base_url())
        .map(|url| normalize_base_url(&url))
        .transpose()
        .map_err(|error| CliError::Config(error.to_string()))?;
    let merged_reporter_id = normalize_text_option(reporter_id)
        .or_else(|| normalize_text_option(env::var(REPORTER_ID_ENV).ok()))
        .or_else(|| existing_profile.reporter_id());
    let merged_page_size = match page_size {
        Some(0) => {
            return Err(CliError::Config(
                "page_size must be greater than zero".to_string(),
            ))
        }
        Some(size) => Some(size),
        None => env_page_size()?.or_else(|| existing_profile.page_size()),
    };

    let profile = config.profile_mut_or_default(&profile_name);
    profile.api_base_url = merged_api_base_url;
    profile.reporter_id = merged_reporter_id;
    profile.page_size = merged_page_size;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profiles
        .get(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let mut missing_fields = Vec::new();
    if profile.api_base_url().is_none() {
        missing_fields.push("api_base_url");
    }
    if profile.reporter_id().is_none() {
        missing_fields.push("reporter_id");
    }
    if missing_fields.is_empty() {
        println!("Profile '{profile_name}' is ready. Run `minetrack sync` to download the directory.");
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

fn env_page_size() -> Result<Option<usize>, CliError> {
    let Some(raw) = normalize_text_option(env::var(PAGE_SIZE_ENV).ok()) else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(CliError::Config(format!(
            "{PAGE_SIZE_ENV} must be a positive integer, got '{raw}'"
        ))),
        Ok(size) => Ok(Some(size)),
    }
}
