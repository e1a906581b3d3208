use crate::model::{Block, BlockKind, Document, Inline, Selection};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },
    #[error("range {from}..{to} crosses a block boundary")]
    CrossesBlock { from: usize, to: usize },
    #[error("no block follows position {0}")]
    NothingToJoin(usize),
    #[error("invalid heading level {0}")]
    InvalidHeading(u8),
}

/// A single invertible document change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Replace `[from, to)` (inside one block) with inline content
    Replace {
        from: usize,
        to: usize,
        content: Vec<Inline>,
    },
    /// Split the block at `pos`; the new second block gets `kind`
    Split { pos: usize, kind: BlockKind },
    /// Merge the block ending at `pos` with the block after it
    Join { pos: usize },
    /// Change the kind of the block containing `pos`
    SetKind { pos: usize, kind: BlockKind },
    /// Replace the whole document
    ReplaceAll { blocks: Vec<Block> },
}

impl Step {
    pub fn delete(from: usize, to: usize) -> Step {
        Step::Replace {
            from,
            to,
            content: Vec::new(),
        }
    }

    pub fn insert_text(pos: usize, text: &str) -> Step {
        Step::Replace {
            from: pos,
            to: pos,
            content: vec![Inline::Text(text.to_string())],
        }
    }

    /// Apply the step, returning the step that undoes it.
    /// On error the document is unchanged.
    pub fn apply(&self, doc: &mut Document) -> Result<Step, StepError> {
        let size = doc.size();
        match self {
            Step::Replace { from, to, content } => {
                let (from, to) = (*from, *to);
                if to > size || from > to {
                    return Err(StepError::OutOfRange { pos: to, size });
                }
                let start = doc.resolve(from).ok_or(StepError::OutOfRange { pos: from, size })?;
                let end = doc.resolve(to).ok_or(StepError::OutOfRange { pos: to, size })?;
                if start.block != end.block {
                    return Err(StepError::CrossesBlock { from, to });
                }
                let inserted: usize = content.iter().map(Inline::size).sum();
                let removed = doc.blocks_mut()[start.block].replace(
                    start.offset,
                    end.offset,
                    content.clone(),
                );
                Ok(Step::Replace {
                    from,
                    to: from + inserted,
                    content: removed,
                })
            }
            Step::Split { pos, kind } => {
                let rp = doc.resolve(*pos).ok_or(StepError::OutOfRange { pos: *pos, size })?;
                let blocks = doc.blocks_mut();
                let tail = blocks[rp.block].split_off(rp.offset);
                blocks.insert(rp.block + 1, Block::new(*kind, tail));
                Ok(Step::Join { pos: *pos })
            }
            Step::Join { pos } => {
                let rp = doc.resolve(*pos).ok_or(StepError::OutOfRange { pos: *pos, size })?;
                let blocks = doc.blocks_mut();
                if rp.offset != blocks[rp.block].size() || rp.block + 1 >= blocks.len() {
                    return Err(StepError::NothingToJoin(*pos));
                }
                let next = blocks.remove(rp.block + 1);
                blocks[rp.block].append(next.content);
                Ok(Step::Split {
                    pos: *pos,
                    kind: next.kind,
                })
            }
            Step::SetKind { pos, kind } => {
                if let BlockKind::Heading(level) = kind
                    && !(1..=6).contains(level)
                {
                    return Err(StepError::InvalidHeading(*level));
                }
                let rp = doc.resolve(*pos).ok_or(StepError::OutOfRange { pos: *pos, size })?;
                let block = &mut doc.blocks_mut()[rp.block];
                let old = block.kind;
                block.kind = *kind;
                Ok(Step::SetKind {
                    pos: *pos,
                    kind: old,
                })
            }
            Step::ReplaceAll { blocks } => {
                let old = std::mem::replace(doc, Document::new(blocks.clone()));
                Ok(Step::ReplaceAll {
                    blocks: old.blocks().to_vec(),
                })
            }
        }
    }

    /// Map a position from before this step to after it.
    /// Positions at an insertion point move past the inserted content.
    pub fn map(&self, pos: usize, size_after: usize) -> usize {
        match self {
            Step::Replace { from, to, content } => {
                let inserted: usize = content.iter().map(Inline::size).sum();
                if pos < *from {
                    pos
                } else if pos >= *to {
                    pos - (to - from) + inserted
                } else {
                    from + inserted
                }
            }
            Step::Split { pos: at, .. } => {
                if pos < *at {
                    pos
                } else {
                    pos + 1
                }
            }
            Step::Join { pos: at } => {
                if pos <= *at {
                    pos
                } else {
                    pos - 1
                }
            }
            Step::SetKind { .. } => pos,
            Step::ReplaceAll { .. } => pos.min(size_after),
        }
    }
}

/// Where a transaction came from. Drives history grouping and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Typing,
    Command,
    Mention,
    Paste,
    InputRule,
    Improve,
    External,
    Remote,
    History,
}

impl Origin {
    /// Whether transactions of this origin enter the undo history
    pub fn records_history(self) -> bool {
        !matches!(self, Origin::External | Origin::Remote | Origin::History)
    }

    /// Whether transactions of this origin are sent to collaborators
    pub fn broadcasts(self) -> bool {
        !matches!(self, Origin::External | Origin::Remote)
    }
}

/// An ordered batch of steps applied atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub steps: Vec<Step>,
    /// Selection after the transaction; mapped through the steps when None
    pub selection: Option<Selection>,
    pub origin: Origin,
}

impl Transaction {
    pub fn new(origin: Origin) -> Self {
        Transaction {
            steps: Vec::new(),
            selection: None,
            origin,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Apply every step or none. Returns the inverse steps in application order.
    pub fn apply(&self, doc: &mut Document) -> Result<Vec<Step>, StepError> {
        apply_steps(&self.steps, doc)
    }
}

/// Apply steps atomically, rolling back applied steps on failure.
pub fn apply_steps(steps: &[Step], doc: &mut Document) -> Result<Vec<Step>, StepError> {
    let mut inverses: Vec<Step> = Vec::with_capacity(steps.len());
    for step in steps {
        match step.apply(doc) {
            Ok(inverse) => inverses.push(inverse),
            Err(e) => {
                for inverse in inverses.iter().rev() {
                    // Inverses of steps that just applied cleanly cannot fail
                    let _ = inverse.apply(doc);
                }
                return Err(e);
            }
        }
    }
    Ok(inverses)
}

/// Steps that delete `[from, to)`, which may span several blocks
pub fn delete_range_steps(doc: &Document, from: usize, to: usize) -> Vec<Step> {
    let size = doc.size();
    let (from, to) = (from.min(size), to.min(size));
    if from >= to {
        return Vec::new();
    }
    let (Some(start), Some(end)) = (doc.resolve(from), doc.resolve(to)) else {
        return Vec::new();
    };
    if start.block == end.block {
        return vec![Step::delete(from, to)];
    }
    let blocks = doc.blocks();
    let mut steps = Vec::new();
    let first_end = start.block_start + blocks[start.block].size();
    if first_end > from {
        steps.push(Step::delete(from, first_end));
    }
    for idx in start.block + 1..=end.block {
        steps.push(Step::Join { pos: from });
        let remove = if idx == end.block {
            end.offset
        } else {
            blocks[idx].size()
        };
        if remove > 0 {
            steps.push(Step::delete(from, from + remove));
        }
    }
    steps
}
