use std::sync::LazyLock;

use regex::Regex;

use crate::model::WorkspaceConfig;

static ISSUE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]*-\d+$").expect("valid issue key regex"));

/// Lookup used to resolve an issue key to its workspace
pub trait IssueLookup {
    /// Some(workspace) if the key names a known issue. The inner value is
    /// the issue's own workspace, when it has one.
    fn issue_workspace(&self, key: &str) -> Option<Option<String>>;
}

pub fn is_issue_key(key: &str) -> bool {
    ISSUE_KEY_RE.is_match(key)
}

/// URL for an issue key. Malformed or unknown keys fall back to the
/// default workspace's landing page.
pub fn resolve_issue_url(key: &str, lookup: &impl IssueLookup, workspace: &WorkspaceConfig) -> String {
    let base = workspace.base_url.trim_end_matches('/');
    let found = if is_issue_key(key) {
        lookup.issue_workspace(key)
    } else {
        None
    };
    match found {
        Some(own) => {
            let slug = own
                .or_else(|| workspace.slug.clone())
                .unwrap_or_else(|| workspace.default_slug.clone());
            format!("{base}/{slug}/issues/{key}")
        }
        None => {
            tracing::debug!(key, "issue key did not resolve; using default workspace");
            format!("{base}/{}", workspace.default_slug)
        }
    }
}
