use crate::model::{Document, Selection};

use super::transform::{Origin, Step, apply_steps};

const UNDO_STACK_LIMIT: usize = 500;

/// One entry on the undo stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A group of steps undone as one user-visible step
    Edit {
        steps: Vec<Step>,
        /// Inverses in application order (undo runs them back to front)
        inverse: Vec<Step>,
        selection_before: Selection,
        selection_after: Selection,
        origin: Origin,
    },
    /// External content or remote change marker. Undo stops here.
    SyncMarker,
}

/// Result of an undo or redo: the steps that ran and where the caret goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reverted {
    pub steps: Vec<Step>,
    pub selection: Selection,
}

/// The undo/redo stack
#[derive(Debug, Default)]
pub struct UndoStack {
    undo: Vec<Operation>,
    redo: Vec<Operation>,
}

impl UndoStack {
    pub fn new() -> Self {
        UndoStack {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Push an edit. Clears the redo stack.
    /// Contiguous typing merges into the previous typing entry.
    pub fn push(&mut self, op: Operation) {
        if let Operation::Edit {
            steps,
            inverse,
            selection_before,
            selection_after,
            origin: Origin::Typing,
        } = op
        {
            if let Some(Operation::Edit {
                steps: prev_steps,
                inverse: prev_inverse,
                selection_after: prev_after,
                origin: Origin::Typing,
                ..
            }) = self.undo.last_mut()
                && *prev_after == selection_before
            {
                prev_steps.extend(steps);
                prev_inverse.extend(inverse);
                *prev_after = selection_after;
                self.redo.clear();
                return;
            }
            self.push_capped(Operation::Edit {
                steps,
                inverse,
                selection_before,
                selection_after,
                origin: Origin::Typing,
            });
            return;
        }
        self.push_capped(op);
    }

    /// Push a sync marker. Clears the redo stack.
    pub fn push_sync_marker(&mut self) {
        if matches!(self.undo.last(), Some(Operation::SyncMarker)) {
            self.redo.clear();
            return;
        }
        self.push_capped(Operation::SyncMarker);
    }

    fn push_capped(&mut self, op: Operation) {
        self.undo.push(op);
        if self.undo.len() > UNDO_STACK_LIMIT {
            self.undo.drain(..self.undo.len() - UNDO_STACK_LIMIT);
        }
        self.redo.clear();
    }

    /// Undo the last edit against `doc`. Returns None at a sync marker or
    /// when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> Option<Reverted> {
        let op = self.undo.pop()?;
        let Operation::Edit {
            inverse,
            selection_before,
            ..
        } = &op
        else {
            // Undo stops at a sync marker; put it back
            self.undo.push(op);
            return None;
        };
        let steps: Vec<Step> = inverse.iter().rev().cloned().collect();
        if let Err(e) = apply_steps(&steps, doc) {
            tracing::warn!("dropping undo entry that no longer applies: {}", e);
            return None;
        }
        let selection = selection_before.clamped(doc.size());
        self.redo.push(op);
        Some(Reverted { steps, selection })
    }

    /// Redo the last undone edit
    pub fn redo(&mut self, doc: &mut Document) -> Option<Reverted> {
        let op = self.redo.pop()?;
        let Operation::Edit {
            steps,
            selection_after,
            ..
        } = &op
        else {
            self.redo.push(op);
            return None;
        };
        let steps = steps.clone();
        if let Err(e) = apply_steps(&steps, doc) {
            tracing::warn!("dropping redo entry that no longer applies: {}", e);
            return None;
        }
        let selection = selection_after.clamped(doc.size());
        self.undo.push(op);
        Some(Reverted { steps, selection })
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn peek_last_undo(&self) -> Option<&Operation> {
        self.undo.last()
    }

    pub fn peek_last_redo(&self) -> Option<&Operation> {
        self.redo.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::transform::Transaction;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Apply a transaction and record it the way the editor does
    fn record(stack: &mut UndoStack, doc: &mut Document, tr: Transaction, before: Selection) {
        let inverse = tr.apply(doc).unwrap();
        stack.push(Operation::Edit {
            steps: tr.steps.clone(),
            inverse,
            selection_before: before,
            selection_after: tr.selection.unwrap_or(before),
            origin: tr.origin,
        });
    }

    fn typing(pos: usize, text: &str) -> Transaction {
        Transaction::new(Origin::Typing)
            .step(Step::insert_text(pos, text))
            .with_selection(Selection::cursor(pos + text.chars().count()))
    }

    // -----------------------------------------------------------------------
    // UndoStack core
    // -----------------------------------------------------------------------

    #[test]
    fn new_stack_is_empty() {
        let stack = UndoStack::new();
        assert!(stack.is_empty());
        assert!(stack.peek_last_undo().is_none());
        assert!(stack.peek_last_redo().is_none());
    }

    #[test]
    fn undo_on_empty_stack_returns_none() {
        let mut stack = UndoStack::new();
        let mut doc = Document::default();
        assert!(stack.undo(&mut doc).is_none());
        assert!(stack.redo(&mut doc).is_none());
    }

    #[test]
    fn undo_then_redo() {
        let mut stack = UndoStack::new();
        let mut doc = Document::from_text("ab");
        let tr = Transaction::new(Origin::Command)
            .step(Step::delete(0, 1))
            .with_selection(Selection::cursor(0));
        record(&mut stack, &mut doc, tr, Selection::cursor(1));
        assert_eq!(doc, Document::from_text("b"));

        let reverted = stack.undo(&mut doc).unwrap();
        assert_eq!(doc, Document::from_text("ab"));
        assert_eq!(reverted.selection, Selection::cursor(1));

        let reverted = stack.redo(&mut doc).unwrap();
        assert_eq!(doc, Document::from_text("b"));
        assert_eq!(reverted.selection, Selection::cursor(0));
    }

    #[test]
    fn contiguous_typing_merges() {
        let mut stack = UndoStack::new();
        let mut doc = Document::default();
        record(&mut stack, &mut doc, typing(0, "h"), Selection::cursor(0));
        record(&mut stack, &mut doc, typing(1, "i"), Selection::cursor(1));
        assert_eq!(doc, Document::from_text("hi"));
        stack.undo(&mut doc).unwrap();
        assert_eq!(doc, Document::default());
        assert!(stack.is_empty());
    }

    #[test]
    fn typing_does_not_merge_into_other_origins() {
        let mut stack = UndoStack::new();
        let mut doc = Document::default();
        let paste = Transaction::new(Origin::Paste)
            .step(Step::insert_text(0, "ab"))
            .with_selection(Selection::cursor(2));
        record(&mut stack, &mut doc, paste, Selection::cursor(0));
        record(&mut stack, &mut doc, typing(2, "c"), Selection::cursor(2));
        stack.undo(&mut doc).unwrap();
        assert_eq!(doc, Document::from_text("ab"));
    }

    #[test]
    fn push_clears_redo() {
        let mut stack = UndoStack::new();
        let mut doc = Document::default();
        record(&mut stack, &mut doc, typing(0, "a"), Selection::cursor(0));
        stack.undo(&mut doc).unwrap();
        assert!(stack.peek_last_redo().is_some());
        let tr = Transaction::new(Origin::Command).step(Step::insert_text(0, "z"));
        record(&mut stack, &mut doc, tr, Selection::cursor(0));
        assert!(stack.peek_last_redo().is_none());
    }

    #[test]
    fn undo_stops_at_sync_marker() {
        let mut stack = UndoStack::new();
        let mut doc = Document::default();
        record(&mut stack, &mut doc, typing(0, "a"), Selection::cursor(0));
        stack.push_sync_marker();
        stack.push_sync_marker();
        assert!(stack.undo(&mut doc).is_none());
        assert_eq!(doc, Document::from_text("a"));
        assert_eq!(stack.peek_last_undo(), Some(&Operation::SyncMarker));
    }

    #[test]
    fn stack_limit_enforcement() {
        let mut stack = UndoStack::new();
        let mut doc = Document::default();
        for i in 0..=UNDO_STACK_LIMIT {
            let tr = Transaction::new(Origin::Command).step(Step::insert_text(i, "x"));
            record(&mut stack, &mut doc, tr, Selection::cursor(i));
        }
        assert_eq!(stack.undo.len(), UNDO_STACK_LIMIT);
    }
}
