use std::time::Instant;

use crate::model::MentionCandidate;

use super::adapter::DocumentAdapter;
use super::guard::Guards;
use super::scanner::TriggerMatch;
use super::transform::Origin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A previous insertion still holds the guard; nothing happened
    Busy,
    /// Inputs failed validation; nothing happened
    Aborted,
    /// The mention node now sits at `at`, with the caret right after it
    Inserted { at: usize },
    /// The structured insert was rejected. `applied` tells whether the
    /// plain-text fallback made it into the document.
    FellBack { applied: bool },
}

/// Insert `candidate` over the trigger span `[trigger.position, caret)`.
///
/// `turn` and `now` stamp the guard hold; the flags release when the
/// scheduler reaches a later turn or the deadline passes.
pub fn insert_mention(
    doc: &mut impl DocumentAdapter,
    guards: &mut Guards,
    turn: u64,
    now: Instant,
    candidate: &MentionCandidate,
    trigger: &TriggerMatch,
) -> InsertOutcome {
    if guards.is_inserting_mention() {
        tracing::debug!("mention insert skipped: previous insert still settling");
        return InsertOutcome::Busy;
    }

    let size = doc.size();
    let cursor = doc.selection().head.min(size);
    let position = trigger.position.min(size);
    if position >= cursor || candidate.kind() != trigger.kind {
        tracing::debug!(position, cursor, "mention insert aborted: invalid trigger span");
        return InsertOutcome::Aborted;
    }

    // Flags go up before any mutation so the resulting change is observed
    // with them set. Their release turn is fixed here, unconditionally.
    guards.hold_for_mention(turn, now);

    // The document may have moved under us since the scan
    let still_there = doc
        .text_between(position, position + 1)
        .starts_with(trigger.char);
    if still_there && doc.delete_range_and_insert_node(position, cursor, candidate.to_node()) {
        tracing::debug!(at = position, id = candidate.id(), "mention inserted");
        return InsertOutcome::Inserted { at: position };
    }

    let text = format!("{}{}", trigger.char, candidate.label());
    tracing::warn!(
        position,
        cursor,
        still_there,
        "structured mention insert rejected; inserting {:?} as text",
        text
    );
    let applied = if still_there {
        doc.replace_range_with_text(position, cursor, &text)
    } else {
        doc.insert_text(&text, Origin::Mention)
    };
    InsertOutcome::FellBack { applied }
}
