use std::fs;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, CONFIG_FILE};

const DIRECTORY_FILE: &str = "people.toml";

const CONFIG_TEMPLATE: &str = r##"[workspace]
base_url = "{base_url}"
slug = "{slug}"
# Used when an issue key is not in the directory
default_slug = "{slug}"

[directory]
# Users and issues offered after @ and #. Relative to this file.
path = "people.toml"

[editor]
# scan_window = 50
# max_scan_iterations = 100
# guard_release_turns = 1
# guard_timeout_ms = 250

[popover]
# max_visible = 8
# width = 32

[log]
# file = "threadpad.log"
# level = "warn"

# [ui.colors]
# background = "#0C001B"
# text = "#B0AAFF"
# highlight = "#FB4196"
# cyan = "#44DDFF"
# purple = "#CC66FF"
"##;

const DIRECTORY_TEMPLATE: &str = r##"# People and issues offered as mention suggestions.
#
# [[users]]
# id = "u1"
# name = "Jo Smith"
# email = "jo@example.com"
# workspaces = ["{slug}"]
#
# [[issues]]
# key = "PRJ-1"
# title = "First issue"
# type = "TASK"
# workspace = "{slug}"
"##;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Validate that a workspace slug is lowercase alphanumeric with hyphens only.
fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("workspace slug cannot be empty".to_string());
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "invalid workspace slug \"{}\": use lowercase with hyphens (e.g. \"my-team\")",
            slug
        ));
    }
    Ok(())
}

/// Infer a slug from a directory name: lowercase, runs of other characters
/// become single hyphens.
fn infer_slug(dir_name: &str) -> String {
    let mut slug = String::new();
    for c in dir_name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "default".to_string()
    } else {
        slug
    }
}

fn render_config(slug: &str, base_url: &str) -> String {
    CONFIG_TEMPLATE
        .replace("{slug}", slug)
        .replace("{base_url}", base_url)
}

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;

    // A config further up would otherwise have applied here
    if let Some(parent) = cwd.parent()
        && let Some(existing) = config_io::discover_config(parent)
    {
        eprintln!("Note: {} will be shadowed here", existing.display());
    }

    let slug = args.slug.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .map(infer_slug)
            .unwrap_or_else(|| "default".to_string())
    });
    validate_slug(&slug)?;
    let base_url = args
        .base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let config_path = cwd.join(CONFIG_FILE);
    let directory_path = cwd.join(DIRECTORY_FILE);
    // Check both before writing either
    if !args.force {
        for path in [&config_path, &directory_path] {
            if path.exists() {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
        }
    }
    fs::write(&config_path, render_config(&slug, &base_url))?;
    fs::write(&directory_path, DIRECTORY_TEMPLATE.replace("{slug}", &slug))?;

    println!("Initialized threadpad workspace: {}", slug);
    println!("  config: {}", CONFIG_FILE);
    println!("  directory: {}", DIRECTORY_FILE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Config;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("acme").is_ok());
        assert!(validate_slug("team-2").is_ok());
        assert!(validate_slug("Acme").is_err());
        assert!(validate_slug("under_score").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_infer_slug() {
        assert_eq!(infer_slug("My Cool Project"), "my-cool-project");
        assert_eq!(infer_slug("api_v2"), "api-v2");
        assert_eq!(infer_slug("--"), "default");
    }

    #[test]
    fn test_rendered_config_parses() {
        let text = render_config("acme", "https://track.example");
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.workspace.slug.as_deref(), Some("acme"));
        assert_eq!(config.workspace.default_slug, "acme");
        assert_eq!(config.workspace.base_url, "https://track.example");
        assert_eq!(config.editor.scan_window, 50);
    }

    #[test]
    fn test_directory_template_parses_empty() {
        let text = DIRECTORY_TEMPLATE.replace("{slug}", "acme");
        let value: toml::Table = toml::from_str(&text).unwrap();
        assert!(value.is_empty());
    }
}
