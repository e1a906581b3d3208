use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tp", about = concat!("threadpad v", env!("CARGO_PKG_VERSION"), " - comments with @people and #issues"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this config file instead of discovering threadpad.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter threadpad.toml and user/issue directory here
    Init(InitArgs),
    /// Open the composer (default when no subcommand is given)
    Compose(ComposeArgs),
    /// Find the mention trigger before the cursor in a line of text
    Scan(ScanArgs),
    /// Query the directory for mention candidates
    Suggest(SuggestArgs),
    /// Print the URL an issue key links to
    Resolve(ResolveArgs),
}

// ---------------------------------------------------------------------------
// Args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Workspace slug (default: inferred from directory name)
    #[arg(long)]
    pub slug: Option<String>,
    /// Base URL of the tracker
    #[arg(long)]
    pub base_url: Option<String>,
    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Default)]
pub struct ComposeArgs {
    /// Markup file the draft is loaded from and autosaved to
    #[arg(long)]
    pub draft: Option<PathBuf>,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Text to scan, as a single paragraph
    pub text: String,
    /// Cursor position in characters (default: end of text)
    #[arg(long)]
    pub cursor: Option<usize>,
}

#[derive(Args)]
pub struct SuggestArgs {
    /// Query text, without the trigger character
    pub query: String,
    /// Search issues instead of users
    #[arg(long)]
    pub issues: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Issue key, e.g. PRJ-12
    pub key: String,
}
