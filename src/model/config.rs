use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration from threadpad.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub popover: PopoverConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Characters scanned backwards from the cursor for a trigger
    #[serde(default = "default_scan_window")]
    pub scan_window: usize,
    /// Upper bound on candidate triggers examined per scan
    #[serde(default = "default_max_scan_iterations")]
    pub max_scan_iterations: usize,
    /// Scheduler turns before guard flags are released (at least 1)
    #[serde(default = "default_guard_release_turns")]
    pub guard_release_turns: u64,
    /// Wall-clock fallback that releases guard flags if the scheduler stalls
    #[serde(default = "default_guard_timeout_ms")]
    pub guard_timeout_ms: u64,
    /// Width used for layout until the host reports its real size
    #[serde(default = "default_viewport_width")]
    pub viewport_width: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            scan_window: default_scan_window(),
            max_scan_iterations: default_max_scan_iterations(),
            guard_release_turns: default_guard_release_turns(),
            guard_timeout_ms: default_guard_timeout_ms(),
            viewport_width: default_viewport_width(),
        }
    }
}

impl EditorConfig {
    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }
}

fn default_scan_window() -> usize {
    50
}

fn default_max_scan_iterations() -> usize {
    100
}

fn default_guard_release_turns() -> u64 {
    1
}

fn default_guard_timeout_ms() -> u64 {
    250
}

fn default_viewport_width() -> usize {
    80
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopoverConfig {
    /// Maximum number of visible entries in the dropdown
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
    /// Fixed popover width in cells
    #[serde(default = "default_popover_width")]
    pub width: usize,
    /// Minimum distance kept from the container edges
    #[serde(default = "default_inset")]
    pub inset: usize,
}

impl Default for PopoverConfig {
    fn default() -> Self {
        PopoverConfig {
            max_visible: default_max_visible(),
            width: default_popover_width(),
            inset: default_inset(),
        }
    }
}

fn default_max_visible() -> usize {
    8
}

fn default_popover_width() -> usize {
    32
}

fn default_inset() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Workspace used for user-search scoping
    #[serde(default)]
    pub slug: Option<String>,
    /// Workspace used when an issue key cannot be resolved
    #[serde(default = "default_workspace_slug")]
    pub default_slug: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            base_url: default_base_url(),
            slug: None,
            default_slug: default_workspace_slug(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_workspace_slug() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// TOML file listing users and issues, relative to the config file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log file for the TUI. Logging is off in the TUI when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Default filter directive when THREADPAD_LOG is unset
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Hex color overrides for the composer theme, keyed by theme slot
    #[serde(default)]
    pub colors: HashMap<String, String>,
}
