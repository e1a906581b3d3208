mod init;
pub use init::cmd_init;

use std::path::Path;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::editor::issue_link::{is_issue_key, resolve_issue_url};
use crate::editor::scanner::{self, ScanOptions};
use crate::editor::suggest::SuggestionSource;
use crate::io::config_io::{self, ConfigError};
use crate::io::directory::{Directory, DirectoryError};
use crate::io::log;
use crate::model::{Block, Config, Document, MentionCandidate, MentionKind};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let config_path = cli.config.as_deref();

    match cli.command {
        None => cmd_compose(ComposeArgs::default(), config_path),
        Some(cmd) => match cmd {
            Commands::Init(args) => cmd_init(args),
            Commands::Compose(args) => cmd_compose(args, config_path),
            Commands::Scan(args) => cmd_scan(args, json, config_path),
            Commands::Suggest(args) => cmd_suggest(args, json, config_path),
            Commands::Resolve(args) => cmd_resolve(args, json, config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config_cwd(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
        path: ".".into(),
        source: e,
    })?;
    config_io::load_config(explicit, &cwd)
}

/// The configured directory, or an empty one when none is configured
fn load_directory(config: &Config) -> Result<Directory, DirectoryError> {
    match &config.directory.path {
        Some(path) => Directory::load(path),
        None => {
            tracing::debug!("no directory configured");
            Ok(Directory::default())
        }
    }
}

/// Config plus stderr logging for the non-interactive commands
fn cli_context(config_path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = load_config_cwd(config_path)?;
    log::init_cli_logging(&config.log);
    Ok(config)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_compose(
    args: ComposeArgs,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_cwd(config_path)?;
    let _log_guard = log::init_tui_logging(&config.log);
    let directory = load_directory(&config)?;
    let markup = crate::tui::run(&config, directory, args.draft.as_deref())?;
    if !markup.is_empty() {
        println!("{}", markup);
    }
    Ok(())
}

fn cmd_scan(
    args: ScanArgs,
    json: bool,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli_context(config_path)?;
    let doc = Document::new(vec![Block::paragraph(&args.text)]);
    let cursor = args.cursor.unwrap_or(doc.size()).min(doc.size());
    let found = if scanner::is_heading_prefix(&doc, cursor) {
        None
    } else {
        scanner::scan(&doc, cursor, &ScanOptions::from(&config.editor))
    };

    if json {
        let out = ScanJson {
            text: &args.text,
            cursor,
            found: found.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        match &found {
            Some(m) => println!("{}", format_trigger(m)),
            None => println!("no mention"),
        }
    }
    Ok(())
}

fn cmd_suggest(
    args: SuggestArgs,
    json: bool,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli_context(config_path)?;
    let directory = load_directory(&config)?;
    let (kind, payloads) = if args.issues {
        (MentionKind::Issue, directory.search_issues(&args.query)?)
    } else {
        let scope = config.workspace.slug.as_deref();
        (MentionKind::User, directory.search_users(&args.query, scope)?)
    };
    let candidates: Vec<MentionCandidate> = payloads
        .into_iter()
        .map(|p| MentionCandidate::normalize(kind, p))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else if candidates.is_empty() {
        println!("no matches");
    } else {
        for c in &candidates {
            println!("{}", format_candidate(c));
        }
    }
    Ok(())
}

fn cmd_resolve(
    args: ResolveArgs,
    json: bool,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli_context(config_path)?;
    let directory = load_directory(&config)?;
    let url = resolve_issue_url(&args.key, &directory, &config.workspace);

    if json {
        let out = ResolveJson {
            key: &args.key,
            valid_key: is_issue_key(&args.key),
            url: &url,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", url);
    }
    Ok(())
}
