use crate::model::{MentionCandidate, PopoverConfig};

use super::layout::Coords;
use super::scanner::TriggerMatch;
use super::suggest::{FetchRequest, FetchResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopoverState {
    Closed,
    /// Query changed, fetch in flight
    Loading,
    /// Candidates (possibly none) are showing
    Open,
}

/// Container size in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

/// Where the popover is drawn, in container cells. Includes the border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl Placement {
    pub fn contains(&self, at: Coords) -> bool {
        at.left >= self.left
            && at.left < self.left + self.width
            && at.top >= self.top
            && at.top < self.top + self.height
    }
}

#[derive(Debug)]
pub struct Popover {
    state: PopoverState,
    trigger: Option<TriggerMatch>,
    candidates: Vec<MentionCandidate>,
    selected: Option<usize>,
    /// Set by arrow keys; while set, pointer hover does not move the highlight
    keyboard_navigation: bool,
    generation: u64,
    max_visible: usize,
    width: usize,
    inset: usize,
}

impl Popover {
    pub fn new(config: &PopoverConfig) -> Self {
        Popover {
            state: PopoverState::Closed,
            trigger: None,
            candidates: Vec::new(),
            selected: None,
            keyboard_navigation: false,
            generation: 0,
            max_visible: config.max_visible.max(1),
            width: config.width.max(4),
            inset: config.inset,
        }
    }

    pub fn state(&self) -> PopoverState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != PopoverState::Closed
    }

    pub fn trigger(&self) -> Option<&TriggerMatch> {
        self.trigger.as_ref()
    }

    pub fn candidates(&self) -> &[MentionCandidate] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&MentionCandidate> {
        self.selected.and_then(|i| self.candidates.get(i))
    }

    pub fn is_keyboard_navigation(&self) -> bool {
        self.keyboard_navigation
    }

    /// Open with nothing to show: a failed fetch or an empty result
    pub fn shows_no_results(&self) -> bool {
        self.state == PopoverState::Open && self.candidates.is_empty()
    }

    /// Track the active trigger. Returns a fetch to issue when the query
    /// changed; an unchanged query keeps the current list.
    pub fn update_query(&mut self, trigger: TriggerMatch) -> Option<FetchRequest> {
        let unchanged = self.is_active()
            && self.trigger.as_ref().is_some_and(|t| {
                t.position == trigger.position && t.kind == trigger.kind && t.query == trigger.query
            });
        if unchanged {
            self.trigger = Some(trigger);
            return None;
        }
        self.generation += 1;
        self.state = PopoverState::Loading;
        self.keyboard_navigation = false;
        let req = FetchRequest {
            generation: self.generation,
            kind: trigger.kind,
            query: trigger.query.clone(),
        };
        self.trigger = Some(trigger);
        Some(req)
    }

    /// Apply a fetch response. Responses for an older query, or arriving
    /// after the popover closed, are dropped. Returns true if applied.
    pub fn receive(&mut self, response: FetchResponse) -> bool {
        if self.state == PopoverState::Closed || response.generation != self.generation {
            tracing::debug!(
                generation = response.generation,
                current = self.generation,
                "dropping stale suggestions"
            );
            return false;
        }
        self.candidates = match response.result {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(query = %response.query, "suggestion fetch failed: {}", e);
                Vec::new()
            }
        };
        self.selected = if self.candidates.is_empty() {
            None
        } else {
            Some(0)
        };
        self.state = PopoverState::Open;
        true
    }

    /// Close and forget the trigger. In-flight fetches become stale.
    pub fn close(&mut self) {
        if self.state != PopoverState::Closed {
            tracing::trace!("popover closed");
        }
        self.state = PopoverState::Closed;
        self.generation += 1;
        self.trigger = None;
        self.candidates.clear();
        self.selected = None;
        self.keyboard_navigation = false;
    }

    pub fn move_down(&mut self) {
        let n = self.candidates.len();
        if n == 0 {
            return;
        }
        self.keyboard_navigation = true;
        self.selected = Some(match self.selected {
            Some(i) => (i + 1) % n,
            None => 0,
        });
    }

    pub fn move_up(&mut self) {
        let n = self.candidates.len();
        if n == 0 {
            return;
        }
        self.keyboard_navigation = true;
        self.selected = Some(match self.selected {
            Some(i) if i > 0 => i - 1,
            _ => n - 1,
        });
    }

    /// Pointer hover over entry `index`. Ignored mid keyboard navigation.
    pub fn hover(&mut self, index: usize) -> bool {
        if self.keyboard_navigation || index >= self.candidates.len() {
            return false;
        }
        self.selected = Some(index);
        true
    }

    /// Highlight entry `index` unconditionally (pointer click)
    pub fn select(&mut self, index: usize) {
        if index < self.candidates.len() {
            self.selected = Some(index);
        }
    }

    /// The highlighted candidate and its trigger, if there is one to commit
    pub fn commit(&self) -> Option<(MentionCandidate, TriggerMatch)> {
        if self.state != PopoverState::Open {
            return None;
        }
        let candidate = self.selected_entry()?.clone();
        let trigger = self.trigger.clone()?;
        Some((candidate, trigger))
    }

    /// Number of entry rows drawn inside the border
    pub fn visible_rows(&self) -> usize {
        match self.state {
            PopoverState::Closed => 0,
            PopoverState::Loading => 1,
            PopoverState::Open => self.candidates.len().clamp(1, self.max_visible),
        }
    }

    /// First candidate index drawn, keeping the highlight on screen
    pub fn scroll_offset(&self) -> usize {
        match self.selected {
            Some(i) if i >= self.max_visible => i + 1 - self.max_visible,
            _ => 0,
        }
    }

    /// Anchor below the caret. Flip left of the caret when the fixed width
    /// would overflow the right edge, and keep clear of the bottom edge.
    pub fn placement(&self, caret: Coords, container: Size) -> Option<Placement> {
        if !self.is_active() {
            return None;
        }
        let width = self.width.min(container.width.saturating_sub(2 * self.inset).max(1));
        let height = self.visible_rows() + 2;

        let mut left = caret.left;
        if left + width > container.width.saturating_sub(self.inset) {
            left = caret.left.saturating_sub(width);
        }
        let left = left.max(self.inset);

        let mut top = caret.top + 1;
        let bottom = container.height.saturating_sub(self.inset);
        if top + height > bottom {
            top = bottom.saturating_sub(height);
        }
        Some(Placement {
            left,
            top,
            width,
            height,
        })
    }

    /// Candidate index under `at`, if it lands on an entry row
    pub fn hit_test(&self, placement: &Placement, at: Coords) -> Option<usize> {
        if self.state != PopoverState::Open || !placement.contains(at) {
            return None;
        }
        let row = at.top.checked_sub(placement.top + 1)?;
        let on_border = at.left == placement.left || at.left + 1 == placement.left + placement.width;
        if row >= self.visible_rows() || on_border {
            return None;
        }
        let index = self.scroll_offset() + row;
        (index < self.candidates.len()).then_some(index)
    }
}
