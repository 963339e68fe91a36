//! Clap derive structures for the `catalog` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// catalog -- browse and edit the instrument catalog
#[derive(Debug, Parser)]
#[command(
    name = "catalog",
    version,
    about = "Browse and edit the instrument catalog from the command line",
    long_about = "A CLI for the instrument catalog API.\n\n\
        Reads are retried on network failures and server errors; edits\n\
        are sent with a bearer token from your profile, env, or keyring.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile to use
    #[arg(long, short = 'p', env = "CATALOG_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, short = 'a', env = "CATALOG_API_ROOT", global = true)]
    pub api_root: Option<String>,

    /// Access token for edits (overrides profile, env, and keyring)
    #[arg(long, global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CATALOG_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "CATALOG_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CATALOG_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse instrument categories
    #[command(alias = "cat")]
    Categories(CategoriesArgs),

    /// Browse and edit instruments
    #[command(alias = "inst", alias = "i")]
    Instruments(InstrumentsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Command {
    /// Subcommand path as typed, e.g. `"instruments delete"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Categories(args) => args.command.name(),
            Self::Instruments(args) => args.command.name(),
            Self::Config(_) => "config",
            Self::Completions(_) => "completions",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CATEGORIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CategoriesCommand {
    /// List all categories
    #[command(alias = "ls")]
    List,

    /// Show one category
    Get {
        /// Category slug (e.g. "winds")
        slug: String,
    },
}

impl CategoriesCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List => "categories list",
            Self::Get { .. } => "categories get",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INSTRUMENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InstrumentsArgs {
    #[command(subcommand)]
    pub command: InstrumentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum InstrumentsCommand {
    /// List instruments, optionally in one category
    #[command(alias = "ls")]
    List {
        /// Category ID
        #[arg(long, short = 'c', allow_negative_numbers = true)]
        category: Option<i64>,
    },

    /// Show one instrument
    Get {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },

    /// Create an instrument
    Create(InstrumentFields),

    /// Replace an instrument's fields
    Update {
        #[arg(allow_negative_numbers = true)]
        id: i64,

        #[command(flatten)]
        fields: InstrumentFields,
    },

    /// Delete an instrument
    #[command(alias = "rm")]
    Delete {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
}

impl InstrumentsCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "instruments list",
            Self::Get { .. } => "instruments get",
            Self::Create(_) => "instruments create",
            Self::Update { .. } => "instruments update",
            Self::Delete { .. } => "instruments delete",
        }
    }
}

/// Fields of an instrument, given as flags or as a JSON file.
#[derive(Debug, Args)]
pub struct InstrumentFields {
    /// Read the instrument from a JSON file instead of flags
    #[arg(long, short = 'F', conflicts_with_all = ["name", "category", "summary", "description", "image_url"])]
    pub from_file: Option<PathBuf>,

    #[arg(long, required_unless_present = "from_file")]
    pub name: Option<String>,

    /// Category ID
    #[arg(long, required_unless_present = "from_file", allow_negative_numbers = true)]
    pub category: Option<i64>,

    #[arg(long, default_value = "")]
    pub summary: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub image_url: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile
    Init {
        /// API root URL
        #[arg(long)]
        api_root: String,

        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,
    },

    /// Display current configuration (tokens redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an access token (read from stdin) in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Remove a stored access token from the system keyring
    ClearToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
