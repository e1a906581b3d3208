use serde::Serialize;

use crate::editor::TriggerMatch;
use crate::model::{MentionCandidate, MentionKind};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ScanJson<'a> {
    pub text: &'a str,
    pub cursor: usize,
    #[serde(rename = "match")]
    pub found: Option<&'a TriggerMatch>,
}

#[derive(Serialize)]
pub struct ResolveJson<'a> {
    pub key: &'a str,
    pub valid_key: bool,
    pub url: &'a str,
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

fn kind_name(kind: MentionKind) -> &'static str {
    match kind {
        MentionKind::User => "user",
        MentionKind::Issue => "issue",
    }
}

/// One line describing a trigger match
pub fn format_trigger(m: &TriggerMatch) -> String {
    format!(
        "{} mention at {}: {}{}",
        kind_name(m.kind),
        m.position,
        m.char,
        m.query
    )
}

/// One line per candidate: id, label and detail separated by two spaces
pub fn format_candidate(c: &MentionCandidate) -> String {
    let mut line = format!("{}  {}", c.id(), c.label());
    if let Some(detail) = c.detail() {
        line.push_str("  ");
        line.push_str(&detail);
    }
    line
}
