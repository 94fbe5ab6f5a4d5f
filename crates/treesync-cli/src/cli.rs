use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "treesync",
    about = "Inspect structural diffs and patches between JSON trees",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with diff/apply settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Identity field for `$$<id>` segments and upserts (overrides --config)
    #[arg(long, global = true)]
    pub id_field: Option<String>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the patch that turns OLD into NEW
    Diff(DiffArgs),
    /// Apply a patch file to a tree
    Apply(ApplyArgs),
    /// Diff, apply, and verify the result equals NEW
    Check(DiffArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Prefix every emitted path with this pointer
    #[arg(long, default_value = "")]
    pub ancestor: String,
    /// Match sequence records by this field instead of by position
    #[arg(long)]
    pub hash_key: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub tree: PathBuf,
    pub patch: PathBuf,
}
