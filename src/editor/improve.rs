use std::sync::Arc;

use crate::model::{Document, Inline, Selection};

use super::adapter::EditorState;
use super::bridge::{Bridge, Dispatch};
use super::transform::{Origin, Step, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("nothing to improve")]
    Empty,
    #[error("select text within a single paragraph")]
    SpansBlocks,
    #[error("improve backend failed: {0}")]
    Backend(String),
}

/// The opaque rewrite function. May block.
pub trait TextTransform: Send + Sync {
    fn improve(&self, text: &str) -> Result<String, TransformError>;
}

/// Local stand-in transform: collapses runs of spaces, capitalizes the start
/// of each sentence and ends the text with punctuation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tidy;

impl TextTransform for Tidy {
    fn improve(&self, text: &str) -> Result<String, TransformError> {
        let lines: Vec<String> = text
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();
        let joined = lines.join("\n");
        if joined.trim().is_empty() {
            return Err(TransformError::Empty);
        }
        let mut out = String::with_capacity(joined.len() + 1);
        let mut sentence_start = true;
        for c in joined.chars() {
            if sentence_start && c.is_alphabetic() {
                out.extend(c.to_uppercase());
                sentence_start = false;
            } else {
                out.push(c);
                if matches!(c, '.' | '!' | '?' | '\n') {
                    sentence_start = true;
                } else if !c.is_whitespace() {
                    sentence_start = false;
                }
            }
        }
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
        if !out.ends_with(['.', '!', '?']) {
            out.push('.');
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Range { from: usize, to: usize },
    Document,
}

#[derive(Debug, Clone, Copy)]
struct Job {
    generation: u64,
    version: u64,
    target: Target,
}

#[derive(Debug)]
struct ImproveResult {
    generation: u64,
    result: Result<String, TransformError>,
}

pub struct Improver {
    transform: Arc<dyn TextTransform>,
    bridge: Bridge<ImproveResult>,
    generation: u64,
    pending: Option<Job>,
}

impl Improver {
    pub fn new(transform: Arc<dyn TextTransform>, dispatch: Dispatch) -> Self {
        Improver {
            transform,
            bridge: Bridge::new(dispatch),
            generation: 0,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Send the selection (or the whole document when the selection is
    /// empty) to the transform. Supersedes any pending request.
    pub fn start(&mut self, state: &EditorState) -> Result<(), TransformError> {
        let sel = state.selection();
        let (target, text) = if sel.is_empty() {
            (Target::Document, state.doc().to_plain_text())
        } else {
            let (from, to) = (sel.from(), sel.to());
            (Target::Range { from, to }, range_text(state.doc(), from, to)?)
        };
        if text.trim().is_empty() {
            return Err(TransformError::Empty);
        }
        self.generation += 1;
        let generation = self.generation;
        self.pending = Some(Job {
            generation,
            version: state.version(),
            target,
        });
        let transform = Arc::clone(&self.transform);
        tracing::debug!(generation, "improve requested");
        self.bridge.spawn(move || ImproveResult {
            generation,
            result: transform.improve(&text),
        });
        Ok(())
    }

    /// Apply finished results. Returns messages to surface to the user.
    pub fn poll(&mut self, state: &mut EditorState) -> Vec<String> {
        let mut toasts = Vec::new();
        for done in self.bridge.try_recv_all() {
            let Some(job) = self.pending.filter(|j| j.generation == done.generation) else {
                tracing::debug!(generation = done.generation, "dropping superseded improve result");
                continue;
            };
            self.pending = None;
            let text = match done.result {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("improve failed: {}", e);
                    toasts.push(format!("Improve failed: {e}"));
                    continue;
                }
            };
            if state.version() != job.version {
                tracing::info!("document changed during improve; result discarded");
                toasts.push("Document changed while improving; result discarded".to_string());
                continue;
            }
            let tr = match job.target {
                Target::Range { from, to } => {
                    let text = text.replace('\n', " ");
                    let end = from + text.chars().count();
                    Transaction::new(Origin::Improve)
                        .step(Step::Replace {
                            from,
                            to,
                            content: vec![Inline::Text(text)],
                        })
                        .with_selection(Selection::range(from, end))
                }
                Target::Document => Transaction::new(Origin::Improve).step(Step::ReplaceAll {
                    blocks: Document::from_text(&text).blocks().to_vec(),
                }),
            };
            if let Err(e) = state.dispatch(tr) {
                tracing::warn!("improve result no longer applies: {}", e);
                toasts.push(format!("Improve failed: {e}"));
            }
        }
        toasts
    }
}

impl std::fmt::Debug for Improver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Improver")
            .field("generation", &self.generation)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// Text of `[from, to)` inside one block, mentions rendered as `@label`
fn range_text(doc: &Document, from: usize, to: usize) -> Result<String, TransformError> {
    let (Some(start), Some(end)) = (doc.resolve(from), doc.resolve(to)) else {
        return Err(TransformError::Empty);
    };
    if start.block != end.block {
        return Err(TransformError::SpansBlocks);
    }
    let content = doc.blocks()[start.block].slice(start.offset, end.offset);
    Ok(content
        .iter()
        .map(|node| match node {
            Inline::Text(s) => s.clone(),
            Inline::Mention(m) => m.render_text(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::markup;
    use pretty_assertions::assert_eq;

    struct Failing;

    impl TextTransform for Failing {
        fn improve(&self, _text: &str) -> Result<String, TransformError> {
            Err(TransformError::Backend("timeout".into()))
        }
    }

    fn improver(transform: impl TextTransform + 'static) -> Improver {
        Improver::new(Arc::new(transform), Dispatch::Inline)
    }

    #[test]
    fn tidy_cleans_up_text() {
        assert_eq!(
            Tidy.improve("hello   world. this is   fine").unwrap(),
            "Hello world. This is fine."
        );
        assert_eq!(Tidy.improve("  "), Err(TransformError::Empty));
        assert_eq!(Tidy.improve("done!").unwrap(), "Done!");
    }

    #[test]
    fn improves_whole_document_as_one_undo_step() {
        let mut state = EditorState::new(Document::from_text("hi  there"), 80);
        let mut imp = improver(Tidy);
        imp.start(&state).unwrap();
        assert!(imp.is_pending());
        assert!(imp.poll(&mut state).is_empty());
        assert_eq!(state.doc().to_plain_text(), "Hi there.");
        assert!(state.undo());
        assert_eq!(state.doc().to_plain_text(), "hi  there");
    }

    #[test]
    fn improves_selected_range() {
        let mut state = EditorState::new(Document::from_text("keep this. fix   me"), 80);
        state.set_selection(Selection::range(11, 19));
        let mut imp = improver(Tidy);
        imp.start(&state).unwrap();
        imp.poll(&mut state);
        assert_eq!(state.doc().to_plain_text(), "keep this. Fix me.");
        assert_eq!(state.selection(), Selection::range(11, 18));
    }

    #[test]
    fn range_keeps_mention_labels() {
        let doc = markup::parse("ping @[Jo](user:u1) now");
        assert_eq!(range_text(&doc, 0, doc.size()).unwrap(), "ping @Jo now");
        let doc = Document::from_text("a\nb");
        assert_eq!(range_text(&doc, 0, 3), Err(TransformError::SpansBlocks));
    }

    #[test]
    fn failure_leaves_document_and_reports() {
        let mut state = EditorState::new(Document::from_text("text"), 80);
        let mut imp = improver(Failing);
        imp.start(&state).unwrap();
        let toasts = imp.poll(&mut state);
        assert_eq!(toasts, vec!["Improve failed: improve backend failed: timeout"]);
        assert_eq!(state.doc().to_plain_text(), "text");
        assert!(!imp.is_pending());
    }

    #[test]
    fn edit_during_improve_discards_result() {
        let mut state = EditorState::new(Document::from_text("text"), 80);
        let mut imp = improver(Tidy);
        imp.start(&state).unwrap();
        state.insert("!", Origin::Typing).unwrap();
        let toasts = imp.poll(&mut state);
        assert_eq!(toasts.len(), 1);
        assert_eq!(state.doc().to_plain_text(), "text!");
    }

    #[test]
    fn newer_request_supersedes_older() {
        let mut state = EditorState::new(Document::from_text("one"), 80);
        let mut imp = improver(Tidy);
        imp.start(&state).unwrap();
        imp.start(&state).unwrap();
        assert!(imp.poll(&mut state).is_empty());
        assert_eq!(state.doc().to_plain_text(), "One.");
        assert_eq!(state.version(), 1);
    }
}
