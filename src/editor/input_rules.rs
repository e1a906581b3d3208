use crate::model::{BlockKind, Inline, Selection};

use super::adapter::EditorState;
use super::transform::{Origin, Step, StepError, Transaction};

/// Turn a paragraph that starts with `#`..`######` and a space into a
/// heading. Runs after a space is typed; returns true if it fired.
pub fn apply_heading_rule(state: &mut EditorState) -> Result<bool, StepError> {
    let sel = state.selection();
    if !sel.is_empty() {
        return Ok(false);
    }
    let Some(rp) = state.doc().resolve(sel.head) else {
        return Ok(false);
    };
    let block = &state.doc().blocks()[rp.block];
    if block.kind != BlockKind::Paragraph {
        return Ok(false);
    }
    let Some(Inline::Text(text)) = block.content.first() else {
        return Ok(false);
    };
    let prefix: String = text.chars().take(rp.offset).collect();
    let Some(level) = heading_prefix_level(&prefix) else {
        return Ok(false);
    };
    if prefix.chars().count() != rp.offset {
        return Ok(false);
    }

    let start = rp.block_start;
    let tr = Transaction::new(Origin::InputRule)
        .step(Step::delete(start, sel.head))
        .step(Step::SetKind {
            pos: start,
            kind: BlockKind::Heading(level),
        })
        .with_selection(Selection::cursor(start));
    state.dispatch(tr)?;
    tracing::trace!(level, "heading input rule");
    Ok(true)
}

/// `"## "` -> 2. The whole prefix must be the hash run plus one space.
fn heading_prefix_level(prefix: &str) -> Option<u8> {
    let hashes = prefix.strip_suffix(' ')?;
    let level = hashes.len();
    if (1..=6).contains(&level) && hashes.chars().all(|c| c == '#') {
        Some(level as u8)
    } else {
        None
    }
}
