use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use minetrack_core::models::{Category, ReportType};

#[derive(Parser)]
#[command(name = "minetrack")]
#[command(about = "Browse the mining permit directory and queue field reports offline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for API and reporter configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Treat the device as offline and skip all network calls
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the full directory into the local replica
    Sync {
        /// Records requested per page
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,
        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show per-category sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List records of one category from the local replica
    Browse {
        /// national, local, or hotspots
        #[arg(value_parser = parse_category)]
        category: Category,
        #[command(flatten)]
        filters: BrowseFilters,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the values available for each filter of a category
    Filters {
        /// national, local, or hotspots
        #[arg(value_parser = parse_category)]
        category: Category,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage offline report drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct BrowseFilters {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: usize,
    /// Records per page (0 for all)
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
    /// Case-insensitive text search
    #[arg(short, long)]
    pub search: Option<String>,
    /// Exact province ("all" for any)
    #[arg(long)]
    pub province: Option<String>,
    /// Exact status ("all" for any)
    #[arg(long)]
    pub status: Option<String>,
    /// Exact classification ("all" for any)
    #[arg(long)]
    pub classification: Option<String>,
    /// Exact permit or incident type ("all" for any)
    #[arg(long = "type", value_name = "TYPE")]
    pub record_type: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DraftFields {
    /// GPS latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// GPS longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// GPS accuracy in meters
    #[arg(long)]
    pub accuracy: Option<f64>,
    /// Form data as a JSON object
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,
    /// URL of an already uploaded attachment (repeatable)
    #[arg(long = "attachment", value_name = "URL")]
    pub attachments: Vec<String>,
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Save a new report draft
    #[command(alias = "add")]
    New {
        /// mining, transport, processing, trading, exploration, or small_scale
        #[arg(long = "type", value_name = "TYPE", value_parser = parse_report_type)]
        report_type: ReportType,
        /// Reporter id (defaults to the profile's reporter)
        #[arg(long, value_name = "ID")]
        reporter: Option<String>,
        #[command(flatten)]
        fields: DraftFields,
    },
    /// Update fields of an existing draft
    Edit {
        /// Draft ID or unique ID prefix
        id: String,
        /// Change the report type
        #[arg(long = "type", value_name = "TYPE", value_parser = parse_report_type)]
        report_type: Option<ReportType>,
        #[command(flatten)]
        fields: DraftFields,
    },
    /// List drafts of a reporter
    List {
        /// Reporter id (defaults to the profile's reporter)
        #[arg(long, value_name = "ID")]
        reporter: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a draft
    Delete {
        /// Draft ID or unique ID prefix
        id: String,
    },
    /// Submit every pending draft
    Sync {
        /// Reporter id (defaults to the profile's reporter)
        #[arg(long, value_name = "ID")]
        reporter: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Remote API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Reporter id used for drafts
        #[arg(long, value_name = "ID")]
        reporter_id: Option<String>,
        /// Records requested per page during sync
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

pub fn parse_category(value: &str) -> Result<Category, String> {
    value
        .parse()
        .map_err(|error: minetrack_core::Error| error.to_string())
}

pub fn parse_report_type(value: &str) -> Result<ReportType, String> {
    value
        .parse()
        .map_err(|error: minetrack_core::Error| error.to_string())
}
