use serde::Serialize;

use crate::model::{ATOM_CHAR, EditorConfig, MentionKind, TRIGGER_CHARS};

use super::adapter::DocumentView;

/// An in-progress mention: the trigger character at `position` and the
/// query typed between it and the caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerMatch {
    pub position: usize,
    pub char: char,
    pub query: String,
    pub kind: MentionKind,
}

impl TriggerMatch {
    /// Position just past the typed query
    pub fn span_end(&self) -> usize {
        self.position + 1 + self.query.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// How far left of the caret a trigger may sit
    pub window: usize,
    /// Cap on candidate triggers examined per scan
    pub max_iterations: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            window: 50,
            max_iterations: 100,
        }
    }
}

impl From<&EditorConfig> for ScanOptions {
    fn from(config: &EditorConfig) -> Self {
        ScanOptions {
            window: config.scan_window,
            max_iterations: config.max_scan_iterations,
        }
    }
}

/// Scan backwards from `cursor` for the nearest accepted trigger.
///
/// Candidates are tried right to left across the text nodes inside the
/// window, so the trigger closest to the caret wins whichever character it
/// is. A rejected candidate does not end the search.
pub fn scan(doc: &impl DocumentView, cursor: usize, opts: &ScanOptions) -> Option<TriggerMatch> {
    let cursor = cursor.min(doc.size());
    let floor = cursor.saturating_sub(opts.window);
    if floor >= cursor {
        return None;
    }
    let mut iterations = 0;
    for span in doc.text_spans(floor, cursor).iter().rev() {
        let chars: Vec<char> = span.text.chars().collect();
        let lo = floor.saturating_sub(span.start).min(chars.len());
        let mut hi = cursor.saturating_sub(span.start).min(chars.len());
        while lo < hi {
            let Some(idx) = chars[lo..hi].iter().rposition(|c| TRIGGER_CHARS.contains(c)) else {
                break;
            };
            iterations += 1;
            if iterations > opts.max_iterations {
                tracing::debug!(cursor, "trigger scan hit the iteration cap");
                return None;
            }
            let local = lo + idx;
            let position = span.start + local;
            let char = chars[local];
            let query = doc.text_between(position + 1, cursor);
            if is_query(&query)
                && let Some(kind) = MentionKind::from_trigger(char)
            {
                return Some(TriggerMatch {
                    position,
                    char,
                    query,
                    kind,
                });
            }
            hi = local;
        }
    }
    None
}

/// A query may be empty but never holds whitespace, a trigger character or
/// an atom.
fn is_query(query: &str) -> bool {
    !query
        .chars()
        .any(|c| c.is_whitespace() || c == ATOM_CHAR || TRIGGER_CHARS.contains(&c))
}

/// True when the caret follows a run of two or more `#`, optionally with
/// one trailing space: a markdown heading prefix, not an issue mention.
pub fn is_heading_prefix(doc: &impl DocumentView, cursor: usize) -> bool {
    let cursor = cursor.min(doc.size());
    let before = doc.text_between(cursor.saturating_sub(7), cursor);
    let before = before.strip_suffix(' ').unwrap_or(&before);
    let run = before.chars().rev().take(6).take_while(|&c| c == '#').count();
    run >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, markup};
    use pretty_assertions::assert_eq;

    fn scan_text(text: &str, cursor: usize) -> Option<TriggerMatch> {
        scan(&Document::from_text(text), cursor, &ScanOptions::default())
    }

    fn at_end(text: &str) -> Option<TriggerMatch> {
        scan_text(text, Document::from_text(text).size())
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    #[test]
    fn finds_user_mention_query() {
        assert_eq!(
            at_end("Hello @jo"),
            Some(TriggerMatch {
                position: 6,
                char: '@',
                query: "jo".into(),
                kind: MentionKind::User,
            })
        );
    }

    #[test]
    fn bare_trigger_has_empty_query() {
        let m = at_end("see #").unwrap();
        assert_eq!(m.position, 4);
        assert_eq!(m.query, "");
        assert_eq!(m.kind, MentionKind::Issue);
    }

    #[test]
    fn query_stops_at_cursor() {
        let m = scan_text("@jordan", 3).unwrap();
        assert_eq!(m.query, "jo");
        assert_eq!(m.span_end(), 3);
    }

    #[test]
    fn nearest_trigger_wins_either_char() {
        assert_eq!(at_end("@ann and #PRJ").unwrap().char, '#');
        assert_eq!(at_end("#PRJ-1 @an").unwrap().position, 7);
    }

    #[test]
    fn trigger_in_earlier_text_node_is_found() {
        // "a " then a mention atom then "x @bo"
        let doc = markup::parse("a @[Jo](user:u1)x @bo");
        let m = scan(&doc, doc.size(), &ScanOptions::default()).unwrap();
        assert_eq!(m.position, 5);
        assert_eq!(m.query, "bo");
    }

    // -----------------------------------------------------------------------
    // Rejection
    // -----------------------------------------------------------------------

    #[test]
    fn whitespace_ends_the_mention() {
        assert_eq!(at_end("Hello @jo "), None);
        assert_eq!(at_end("@ jo"), None);
        assert_eq!(at_end("@jo smith"), None);
    }

    #[test]
    fn nested_trigger_does_not_fire_mid_token() {
        // The nearest '@' accepts; the farther one would see '@' in its query
        assert_eq!(at_end("@foo@bar").unwrap().query, "bar");
        assert_eq!(at_end("@foo@").unwrap().query, "");
    }

    #[test]
    fn query_cannot_cross_atom_or_block() {
        let doc = markup::parse("@x@[Jo](user:u1)ab");
        assert_eq!(scan(&doc, doc.size(), &ScanOptions::default()), None);
        assert_eq!(at_end("@jo\nsmith"), None);
    }

    #[test]
    fn trigger_outside_window_is_ignored() {
        let text = format!("@{}", "a".repeat(60));
        assert_eq!(at_end(&text), None);
        let opts = ScanOptions {
            window: 100,
            max_iterations: 100,
        };
        let doc = Document::from_text(&text);
        assert_eq!(scan(&doc, doc.size(), &opts).unwrap().query.len(), 60);
    }

    #[test]
    fn iteration_cap_bounds_repeated_triggers() {
        let text = format!("@a {}", "@ ".repeat(20));
        let opts = ScanOptions {
            window: 200,
            max_iterations: 3,
        };
        let doc = Document::from_text(&text);
        assert_eq!(scan(&doc, doc.size(), &opts), None);
    }

    #[test]
    fn cursor_at_start_or_past_end() {
        assert_eq!(scan_text("@jo", 0), None);
        assert_eq!(scan_text("@jo", 99).unwrap().query, "jo");
    }

    // -----------------------------------------------------------------------
    // Heading prefix
    // -----------------------------------------------------------------------

    #[test]
    fn heading_prefix_detection() {
        let doc = Document::from_text("### ");
        assert!(is_heading_prefix(&doc, 4));
        assert!(is_heading_prefix(&doc, 3));
        assert!(!is_heading_prefix(&doc, 1));
        assert!(!is_heading_prefix(&Document::from_text("# "), 2));
        assert!(!is_heading_prefix(&Document::from_text("#PRJ"), 4));
    }
}
