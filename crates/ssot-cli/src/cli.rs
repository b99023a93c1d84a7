use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ssot_binder::DEFAULT_REGISTRY_PATH;

#[derive(Parser)]
#[command(
    name = "ssot",
    about = "SSOT binder: provenance registry sealed by a Merkle root",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Registry envelope to operate on [default: data/ssot_registry.json]
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    /// The registry path, falling back to the default location.
    pub fn registry_path(&self) -> PathBuf {
        self.registry
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH))
    }
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the registry, every entry with its leaf hash, and the Merkle root
    Show,
    /// Print the Merkle root
    Root,
    /// Show a single entry
    Entry(EntryArgs),
    /// Validate a candidate entry and preview the resulting root
    Validate(CandidateArgs),
    /// Print and verify the inclusion proof for an entry
    Prove(EntryArgs),
    /// Admit a candidate entry and rewrite the registry
    Admit(AdmitArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct EntryArgs {
    pub artifact_id: String,
}

#[derive(Args)]
pub struct CandidateArgs {
    /// JSON file holding the candidate entry
    pub candidate: PathBuf,
}

#[derive(Args)]
pub struct AdmitArgs {
    pub candidate: PathBuf,
    /// Validate and report the new root without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
    /// TOML config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}
