use crate::model::{BlockKind, Document, Inline, MentionNode, Selection, TextSpan};
use crate::util::unicode;

use super::history::{Operation, UndoStack};
use super::layout::{self, Coords};
use super::transform::{Origin, Step, StepError, Transaction, delete_range_steps};

/// Read-only view used by the trigger scanner
pub trait DocumentView {
    fn size(&self) -> usize;
    fn text_between(&self, from: usize, to: usize) -> String;
    fn text_spans(&self, from: usize, to: usize) -> Vec<TextSpan<'_>>;
}

/// Mutating surface used by the mention insertion protocol
pub trait DocumentAdapter: DocumentView {
    fn selection(&self) -> Selection;
    fn coords_at_pos(&self, pos: usize) -> Coords;
    /// Delete `[from, to)` and insert `node` as one undo step. Returns false
    /// (and leaves the document untouched) if the transaction is rejected.
    fn delete_range_and_insert_node(&mut self, from: usize, to: usize, node: MentionNode) -> bool;
    /// Replace `[from, to)` with plain text as one undo step, leaving the
    /// caret after it
    fn replace_range_with_text(&mut self, from: usize, to: usize, text: &str) -> bool;
    /// Insert plain text over the current selection
    fn insert_text(&mut self, text: &str, origin: Origin) -> bool;
}

impl DocumentView for Document {
    fn size(&self) -> usize {
        Document::size(self)
    }

    fn text_between(&self, from: usize, to: usize) -> String {
        Document::text_between(self, from, to)
    }

    fn text_spans(&self, from: usize, to: usize) -> Vec<TextSpan<'_>> {
        Document::text_spans(self, from, to)
    }
}

/// A transaction that was applied, waiting to be observed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    pub steps: Vec<Step>,
    pub origin: Origin,
    pub version: u64,
}

/// Document, selection and history for one editor instance
#[derive(Debug)]
pub struct EditorState {
    doc: Document,
    selection: Selection,
    history: UndoStack,
    version: u64,
    viewport_width: usize,
    changes: Vec<AppliedChange>,
}

impl EditorState {
    pub fn new(doc: Document, viewport_width: usize) -> Self {
        let end = doc.size();
        EditorState {
            doc,
            selection: Selection::cursor(end),
            history: UndoStack::new(),
            version: 0,
            viewport_width: viewport_width.max(1),
            changes: Vec::new(),
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Incremented by every applied transaction
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn viewport_width(&self) -> usize {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: usize) {
        self.viewport_width = width.max(1);
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Changes applied since the last call, oldest first
    pub fn take_changes(&mut self) -> Vec<AppliedChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.doc.size());
    }

    /// Apply a transaction atomically and record it in history
    pub fn dispatch(&mut self, tr: Transaction) -> Result<(), StepError> {
        let before = self.selection;
        let inverse = tr.apply(&mut self.doc)?;
        let size = self.doc.size();
        self.selection = match tr.selection {
            Some(sel) => sel.clamped(size),
            None => map_selection(before, &tr.steps, size),
        };
        if tr.origin.records_history() {
            self.history.push(Operation::Edit {
                steps: tr.steps.clone(),
                inverse,
                selection_before: before,
                selection_after: self.selection,
                origin: tr.origin,
            });
        } else if matches!(tr.origin, Origin::External | Origin::Remote) {
            self.history.push_sync_marker();
        }
        self.record_change(tr.steps, tr.origin);
        Ok(())
    }

    fn record_change(&mut self, steps: Vec<Step>, origin: Origin) {
        self.version += 1;
        self.changes.push(AppliedChange {
            steps,
            origin,
            version: self.version,
        });
    }

    /// Replace the whole document without recording history
    pub fn replace_all(&mut self, doc: Document, origin: Origin) -> Result<(), StepError> {
        let tr = Transaction::new(origin).step(Step::ReplaceAll {
            blocks: doc.blocks().to_vec(),
        });
        self.dispatch(tr)
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&mut self.doc) {
            Some(reverted) => {
                self.selection = reverted.selection;
                self.record_change(reverted.steps, Origin::History);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&mut self.doc) {
            Some(reverted) => {
                self.selection = reverted.selection;
                self.record_change(reverted.steps, Origin::History);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Default editing
    // -----------------------------------------------------------------------

    /// Replace the selection with text. Newlines split blocks.
    pub fn insert(&mut self, text: &str, origin: Origin) -> Result<(), StepError> {
        let sel = self.selection;
        let mut steps = delete_range_steps(&self.doc, sel.from(), sel.to());
        let mut pos = sel.from();
        for (i, line) in text.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if i > 0 {
                steps.push(Step::Split {
                    pos,
                    kind: BlockKind::Paragraph,
                });
                pos += 1;
            }
            if !line.is_empty() {
                steps.push(Step::insert_text(pos, line));
                pos += line.chars().count();
            }
        }
        if steps.is_empty() {
            return Ok(());
        }
        let mut tr = Transaction::new(origin).with_selection(Selection::cursor(pos));
        tr.steps = steps;
        self.dispatch(tr)
    }

    /// Split the current block at the caret
    pub fn split_block(&mut self) -> Result<(), StepError> {
        self.insert("\n", Origin::Command)
    }

    /// Backspace: delete the selection, the grapheme or mention before the
    /// caret, or join with the previous block.
    pub fn delete_backward(&mut self) -> Result<(), StepError> {
        let sel = self.selection;
        if !sel.is_empty() {
            return self.delete_selection();
        }
        let pos = sel.head;
        let Some(rp) = self.doc.resolve(pos) else {
            return Ok(());
        };
        let tr = if rp.offset == 0 {
            let kind = self.doc.blocks()[rp.block].kind;
            if kind != BlockKind::Paragraph {
                Transaction::new(Origin::Command).step(Step::SetKind {
                    pos,
                    kind: BlockKind::Paragraph,
                })
            } else if pos == 0 {
                return Ok(());
            } else {
                Transaction::new(Origin::Command)
                    .step(Step::Join { pos: pos - 1 })
                    .with_selection(Selection::cursor(pos - 1))
            }
        } else {
            let len = self.unit_len_before(pos);
            Transaction::new(Origin::Typing)
                .step(Step::delete(pos - len, pos))
                .with_selection(Selection::cursor(pos - len))
        };
        self.dispatch(tr)
    }

    /// Delete: the selection, the grapheme or mention after the caret, or
    /// join with the next block.
    pub fn delete_forward(&mut self) -> Result<(), StepError> {
        let sel = self.selection;
        if !sel.is_empty() {
            return self.delete_selection();
        }
        let pos = sel.head;
        let Some(rp) = self.doc.resolve(pos) else {
            return Ok(());
        };
        let block_size = self.doc.blocks()[rp.block].size();
        let tr = if rp.offset == block_size {
            if rp.block + 1 >= self.doc.blocks().len() {
                return Ok(());
            }
            Transaction::new(Origin::Command).step(Step::Join { pos })
        } else {
            let len = self.unit_len_after(pos);
            Transaction::new(Origin::Command).step(Step::delete(pos, pos + len))
        }
        .with_selection(Selection::cursor(pos));
        self.dispatch(tr)
    }

    pub fn delete_selection(&mut self) -> Result<(), StepError> {
        let sel = self.selection;
        let steps = delete_range_steps(&self.doc, sel.from(), sel.to());
        if steps.is_empty() {
            return Ok(());
        }
        let mut tr =
            Transaction::new(Origin::Command).with_selection(Selection::cursor(sel.from()));
        tr.steps = steps;
        self.dispatch(tr)
    }

    /// Positions covered by the grapheme or atom ending at `pos`
    fn unit_len_before(&self, pos: usize) -> usize {
        match self.doc.node_at(pos - 1) {
            Some(Inline::Text(_)) => self
                .doc
                .text_spans(pos - 1, pos)
                .first()
                .map_or(1, |span| {
                    unicode::grapheme_chars_before(span.text, pos - span.start).max(1)
                }),
            _ => 1,
        }
    }

    /// Positions covered by the grapheme or atom starting at `pos`
    fn unit_len_after(&self, pos: usize) -> usize {
        match self.doc.node_at(pos) {
            Some(Inline::Text(_)) => self
                .doc
                .text_spans(pos, pos + 1)
                .first()
                .map_or(1, |span| {
                    unicode::grapheme_chars_after(span.text, pos - span.start).max(1)
                }),
            _ => 1,
        }
    }

    // -----------------------------------------------------------------------
    // Caret movement
    // -----------------------------------------------------------------------

    pub fn move_left(&mut self) {
        let sel = self.selection;
        let pos = if !sel.is_empty() {
            sel.from()
        } else if sel.head == 0 {
            0
        } else if matches!(self.doc.resolve(sel.head), Some(rp) if rp.offset == 0) {
            sel.head - 1
        } else {
            sel.head - self.unit_len_before(sel.head)
        };
        self.selection = Selection::cursor(pos);
    }

    pub fn move_right(&mut self) {
        let sel = self.selection;
        let size = self.doc.size();
        let pos = if !sel.is_empty() {
            sel.to()
        } else if sel.head >= size {
            size
        } else {
            match self.doc.resolve(sel.head) {
                Some(rp) if rp.offset == self.doc.blocks()[rp.block].size() => sel.head + 1,
                _ => sel.head + self.unit_len_after(sel.head),
            }
        };
        self.selection = Selection::cursor(pos);
    }

    pub fn move_home(&mut self) {
        if let Some(rp) = self.doc.resolve(self.selection.head) {
            self.selection = Selection::cursor(rp.block_start);
        }
    }

    pub fn move_end(&mut self) {
        if let Some(rp) = self.doc.resolve(self.selection.head) {
            let end = rp.block_start + self.doc.blocks()[rp.block].size();
            self.selection = Selection::cursor(end);
        }
    }

    /// Move to the same offset in the previous (`-1`) or next (`1`) block
    pub fn move_vertical(&mut self, delta: isize) {
        let Some(rp) = self.doc.resolve(self.selection.head) else {
            return;
        };
        let Some(target) = rp.block.checked_add_signed(delta) else {
            return;
        };
        if target >= self.doc.blocks().len() {
            return;
        }
        let start = self.doc.block_start(target);
        let offset = rp.offset.min(self.doc.blocks()[target].size());
        self.selection = Selection::cursor(start + offset);
    }
}

/// Map a selection through steps applied to a document of final size `size`
pub fn map_selection(sel: Selection, steps: &[Step], size: usize) -> Selection {
    let mut sel = sel;
    for step in steps {
        sel = Selection {
            anchor: step.map(sel.anchor, size),
            head: step.map(sel.head, size),
        };
    }
    sel.clamped(size)
}

impl DocumentView for EditorState {
    fn size(&self) -> usize {
        self.doc.size()
    }

    fn text_between(&self, from: usize, to: usize) -> String {
        self.doc.text_between(from, to)
    }

    fn text_spans(&self, from: usize, to: usize) -> Vec<TextSpan<'_>> {
        self.doc.text_spans(from, to)
    }
}

impl DocumentAdapter for EditorState {
    fn selection(&self) -> Selection {
        EditorState::selection(self)
    }

    fn coords_at_pos(&self, pos: usize) -> Coords {
        layout::coords_at_pos(&self.doc, pos.min(self.doc.size()), self.viewport_width)
    }

    fn delete_range_and_insert_node(&mut self, from: usize, to: usize, node: MentionNode) -> bool {
        let tr = Transaction::new(Origin::Mention)
            .step(Step::Replace {
                from,
                to,
                content: vec![Inline::Mention(node)],
            })
            .with_selection(Selection::cursor(from + 1));
        match self.dispatch(tr) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("mention transaction rejected: {}", e);
                false
            }
        }
    }

    fn replace_range_with_text(&mut self, from: usize, to: usize, text: &str) -> bool {
        let tr = Transaction::new(Origin::Mention)
            .step(Step::Replace {
                from,
                to,
                content: vec![Inline::Text(text.to_string())],
            })
            .with_selection(Selection::cursor(from + text.chars().count()));
        match self.dispatch(tr) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("text fallback rejected: {}", e);
                false
            }
        }
    }

    fn insert_text(&mut self, text: &str, origin: Origin) -> bool {
        self.insert(text, origin).is_ok()
    }
}
