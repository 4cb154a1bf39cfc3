use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arrctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative configuration management for indexer managers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Converge remote instances to the configuration document
    Apply(ApplyArgs),

    /// Preview the changes apply would make
    Diff(DiffArgs),

    /// Dump a remote instance's configuration as a document
    Dump(DumpArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Configuration document (defaults to ~/.config/arrctl/arrctl.yml)
    #[arg(short = 'f', long = "file", env = "ARRCTL_CONFIG")]
    pub file: Option<PathBuf>,

    /// Only reconcile this instance
    #[arg(short, long)]
    pub instance: Option<String>,

    /// Plan and display changes without applying them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Re-fetch remote state after apply and fail on residual changes
    #[arg(long)]
    pub verify: bool,

    /// Number of instances to reconcile in parallel (requires --yes)
    #[arg(short, long, default_value = "1")]
    pub jobs: usize,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Configuration document (defaults to ~/.config/arrctl/arrctl.yml)
    #[arg(short = 'f', long = "file", env = "ARRCTL_CONFIG")]
    pub file: Option<PathBuf>,

    /// Only diff this instance
    #[arg(short, long)]
    pub instance: Option<String>,
}

#[derive(Parser)]
pub struct DumpArgs {
    /// Instance URL, e.g. http://localhost:9696
    pub url: String,

    /// API key (probed from the instance when omitted)
    #[arg(short = 'k', long, env = "ARRCTL_API_KEY")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}
