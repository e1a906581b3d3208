use std::sync::Arc;
use std::time::Instant;

use crate::model::{Config, Document, Inline, MentionCandidate, MentionNode, Selection};

use super::adapter::{DocumentAdapter, EditorState};
use super::bridge::Dispatch;
use super::collab::SyncProvider;
use super::guard::Guards;
use super::improve::{Improver, TextTransform};
use super::input_rules;
use super::insertion::{InsertOutcome, insert_mention};
use super::layout::{self, Coords};
use super::popover::{Placement, Popover, Size};
use super::scanner::{self, ScanOptions, TriggerMatch};
use super::scheduler::Scheduler;
use super::suggest::{SuggestionSource, Suggestions};
use super::transform::{Origin, StepError, Transaction};

/// Keys the editor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Escape,
    Undo,
    Redo,
    Improve,
}

/// Clipboard or drag payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Image { name: String, mime: String, bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Key(EditorKey),
    Paste(Payload),
    Drop(Payload),
    SelectionChange(Selection),
    /// Pointer position in container cells
    PointerMove(Coords),
    PointerDown(Coords),
    Resize(Size),
}

/// Something the host should know about, drained with `take_notices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorNotice {
    /// User-visible content changed
    Changed { version: u64, origin: Origin },
    Toast(String),
    /// An image payload was redirected to the upload path
    UploadRequested {
        name: String,
        mime: String,
        bytes: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Scan,
}

/// Turns host events into scans, popover updates and mention inserts.
/// Scans run on the scheduler turn after the keystroke that asked for them.
pub struct MentionEditor {
    state: EditorState,
    guards: Guards,
    scheduler: Scheduler<Task>,
    popover: Popover,
    suggestions: Suggestions,
    improver: Option<Improver>,
    sync: Option<Box<dyn SyncProvider>>,
    scan_options: ScanOptions,
    dispatch: Dispatch,
    container: Size,
    notices: Vec<EditorNotice>,
    /// Latest local change held back while an external update was in flight
    withheld: Option<(u64, Origin)>,
}

impl MentionEditor {
    pub fn new(
        doc: Document,
        config: &Config,
        source: Arc<dyn SuggestionSource>,
        dispatch: Dispatch,
    ) -> Self {
        let editor = &config.editor;
        MentionEditor {
            state: EditorState::new(doc, editor.viewport_width),
            guards: Guards::new(editor.guard_release_turns, editor.guard_timeout()),
            scheduler: Scheduler::new(),
            popover: Popover::new(&config.popover),
            suggestions: Suggestions::new(source, config.workspace.slug.clone(), dispatch),
            improver: None,
            sync: None,
            scan_options: ScanOptions::from(editor),
            dispatch,
            container: Size {
                width: editor.viewport_width,
                height: 24,
            },
            notices: Vec::new(),
            withheld: None,
        }
    }

    pub fn with_improve(mut self, transform: Arc<dyn TextTransform>) -> Self {
        self.improver = Some(Improver::new(transform, self.dispatch));
        self
    }

    pub fn with_sync(mut self, provider: Box<dyn SyncProvider>) -> Self {
        self.sync = Some(provider);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        self.state.doc()
    }

    pub fn selection(&self) -> Selection {
        self.state.selection()
    }

    pub fn popover(&self) -> &Popover {
        &self.popover
    }

    pub fn guards(&self) -> &Guards {
        &self.guards
    }

    pub fn turn(&self) -> u64 {
        self.scheduler.turn()
    }

    pub fn is_improving(&self) -> bool {
        self.improver.as_ref().is_some_and(Improver::is_pending)
    }

    /// Whether a scan or other deferred work is waiting for the next tick
    pub fn has_pending_work(&self) -> bool {
        !self.scheduler.is_idle()
    }

    pub fn take_notices(&mut self) -> Vec<EditorNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Caret position in container cells
    pub fn caret_coords(&self) -> Coords {
        self.state.coords_at_pos(self.state.selection().head)
    }

    pub fn popover_placement(&self) -> Option<Placement> {
        self.popover.placement(self.caret_coords(), self.container)
    }

    /// The mention chip drawn at `at`, if any
    pub fn mention_at(&self, at: Coords) -> Option<&MentionNode> {
        let rows = layout::layout(self.state.doc(), self.state.viewport_width());
        let unit = layout::unit_at(&rows, at).filter(|u| u.mention)?;
        match self.state.doc().node_at(unit.pos)? {
            Inline::Mention(m) => Some(m),
            Inline::Text(_) => None,
        }
    }

    /// Run the trigger scanner at the caret right now
    pub fn scan_now(&self) -> Option<TriggerMatch> {
        scanner::scan(&self.state, self.state.selection().head, &self.scan_options)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Handle an event and apply default editing if the shim did not claim
    /// it. Returns the shim's handled flag.
    pub fn dispatch(&mut self, event: EditorEvent, now: Instant) -> bool {
        let handled = self.handle_event(&event, now);
        if !handled {
            self.apply_default(event);
        }
        self.flush_changes();
        handled
    }

    /// The shim proper. Returns true when the host's default behavior must
    /// be suppressed.
    pub fn handle_event(&mut self, event: &EditorEvent, now: Instant) -> bool {
        self.poll_guards(now);
        match event {
            EditorEvent::Key(key) => self.handle_key(*key, now),
            EditorEvent::Paste(payload) | EditorEvent::Drop(payload) => match payload {
                Payload::Image { name, mime, bytes } => {
                    tracing::debug!(name = %name, mime = %mime, "image payload redirected to upload");
                    self.notices.push(EditorNotice::UploadRequested {
                        name: name.clone(),
                        mime: mime.clone(),
                        bytes: *bytes,
                    });
                    true
                }
                Payload::Text(_) => {
                    self.request_scan();
                    false
                }
            },
            EditorEvent::SelectionChange(_) => {
                if self.popover.is_active() {
                    self.request_scan();
                }
                false
            }
            EditorEvent::PointerMove(at) => match self.popover_hit(*at) {
                Some(index) => {
                    self.popover.hover(index);
                    true
                }
                None => false,
            },
            EditorEvent::PointerDown(at) => {
                if let Some(index) = self.popover_hit(*at) {
                    self.popover.select(index);
                    self.commit_selected(now);
                    return true;
                }
                if self.popover_placement().is_some_and(|p| p.contains(*at)) {
                    return true;
                }
                // Click outside
                self.popover.close();
                false
            }
            EditorEvent::Resize(size) => {
                self.container = *size;
                self.state.set_viewport_width(size.width);
                true
            }
        }
    }

    fn handle_key(&mut self, key: EditorKey, now: Instant) -> bool {
        if self.popover.is_active() {
            match key {
                EditorKey::Down if !self.popover.candidates().is_empty() => {
                    self.popover.move_down();
                    return true;
                }
                EditorKey::Up if !self.popover.candidates().is_empty() => {
                    self.popover.move_up();
                    return true;
                }
                EditorKey::Enter => {
                    if self.popover.commit().is_some() {
                        self.commit_selected(now);
                        return true;
                    }
                    self.popover.close();
                    return false;
                }
                EditorKey::Escape => {
                    self.popover.close();
                    return true;
                }
                _ => {}
            }
        }
        match key {
            EditorKey::Char(c) if c.is_whitespace() => {
                // A space ends any in-progress mention outright
                self.popover.close();
                self.scheduler.cancel(|t| *t == Task::Scan);
                false
            }
            EditorKey::Char(_) | EditorKey::Backspace | EditorKey::Delete => {
                self.request_scan();
                false
            }
            EditorKey::Left
            | EditorKey::Right
            | EditorKey::Up
            | EditorKey::Down
            | EditorKey::Home
            | EditorKey::End
            | EditorKey::Undo
            | EditorKey::Redo => {
                if self.popover.is_active() {
                    self.request_scan();
                }
                false
            }
            EditorKey::Improve => {
                self.start_improve();
                true
            }
            EditorKey::Enter | EditorKey::Escape => false,
        }
    }

    /// Default editing for events the shim left alone
    fn apply_default(&mut self, event: EditorEvent) {
        let result = match event {
            EditorEvent::Key(key) => self.default_key(key),
            EditorEvent::Paste(Payload::Text(text)) | EditorEvent::Drop(Payload::Text(text)) => {
                self.state.insert(&text, Origin::Paste)
            }
            EditorEvent::SelectionChange(sel) => {
                self.state.set_selection(sel);
                Ok(())
            }
            EditorEvent::PointerDown(at) => {
                let pos = layout::pos_at_coords(self.state.doc(), at, self.state.viewport_width());
                self.state.set_selection(Selection::cursor(pos));
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!("edit rejected: {}", e);
        }
    }

    fn default_key(&mut self, key: EditorKey) -> Result<(), StepError> {
        match key {
            EditorKey::Char(c) => {
                self.state.insert(c.encode_utf8(&mut [0; 4]), Origin::Typing)?;
                if c == ' ' {
                    input_rules::apply_heading_rule(&mut self.state)?;
                }
            }
            EditorKey::Enter => self.state.split_block()?,
            EditorKey::Backspace => self.state.delete_backward()?,
            EditorKey::Delete => self.state.delete_forward()?,
            EditorKey::Left => self.state.move_left(),
            EditorKey::Right => self.state.move_right(),
            EditorKey::Up => self.state.move_vertical(-1),
            EditorKey::Down => self.state.move_vertical(1),
            EditorKey::Home => self.state.move_home(),
            EditorKey::End => self.state.move_end(),
            EditorKey::Undo => {
                self.state.undo();
            }
            EditorKey::Redo => {
                self.state.redo();
            }
            EditorKey::Escape | EditorKey::Improve => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scheduler turn
    // -----------------------------------------------------------------------

    /// Advance one cooperative turn: run deferred scans, apply fetch,
    /// improve and remote results, then release due guards.
    pub fn tick(&mut self, now: Instant) {
        for task in self.scheduler.advance() {
            match task {
                Task::Scan => self.run_scan(),
            }
        }
        for response in self.suggestions.drain() {
            self.popover.receive(response);
        }
        if let Some(improver) = self.improver.as_mut() {
            for toast in improver.poll(&mut self.state) {
                self.notices.push(EditorNotice::Toast(toast));
            }
        }
        self.poll_remote();
        self.flush_changes();
        self.poll_guards(now);
    }

    /// Release due guards. Local content changed while the external update
    /// flag was held is reported once, as of the latest such change.
    fn poll_guards(&mut self, now: Instant) {
        self.guards.poll(self.scheduler.turn(), now);
        if self.guards.is_external_update() {
            return;
        }
        if let Some((version, origin)) = self.withheld.take() {
            tracing::trace!(version, "reporting withheld change");
            self.notices.push(EditorNotice::Changed { version, origin });
        }
    }

    fn request_scan(&mut self) {
        if self.guards.is_inserting_mention() {
            tracing::trace!("scan suppressed during mention insert");
            return;
        }
        if !self.scheduler.has_pending(|t| *t == Task::Scan) {
            self.scheduler.defer(Task::Scan);
        }
    }

    fn run_scan(&mut self) {
        if self.guards.is_inserting_mention() {
            return;
        }
        let sel = self.state.selection();
        if !sel.is_empty() || scanner::is_heading_prefix(&self.state, sel.head) {
            self.popover.close();
            return;
        }
        match self.scan_now() {
            Some(trigger) => {
                if let Some(req) = self.popover.update_query(trigger) {
                    self.suggestions.request(req);
                }
            }
            None => self.popover.close(),
        }
    }

    // -----------------------------------------------------------------------
    // Mention insertion
    // -----------------------------------------------------------------------

    /// Insert the highlighted popover candidate
    pub fn commit_selected(&mut self, now: Instant) -> Option<InsertOutcome> {
        let (candidate, trigger) = self.popover.commit()?;
        Some(self.insert(&candidate, &trigger, now))
    }

    /// Run the insertion protocol. The popover closes whatever the outcome.
    pub fn insert(
        &mut self,
        candidate: &MentionCandidate,
        trigger: &TriggerMatch,
        now: Instant,
    ) -> InsertOutcome {
        let turn = self.scheduler.turn();
        let outcome = insert_mention(
            &mut self.state,
            &mut self.guards,
            turn,
            now,
            candidate,
            trigger,
        );
        self.popover.close();
        self.flush_changes();
        outcome
    }

    // -----------------------------------------------------------------------
    // Programmatic and remote content
    // -----------------------------------------------------------------------

    /// Replace the content from outside (a reloaded draft, a new value from
    /// the host). No change notice is emitted for it.
    pub fn set_content(&mut self, doc: Document, now: Instant) {
        if &doc == self.state.doc() {
            return;
        }
        self.guards.hold_external(self.scheduler.turn(), now);
        self.popover.close();
        self.scheduler.cancel(|t| *t == Task::Scan);
        if let Err(e) = self.state.replace_all(doc, Origin::External) {
            tracing::warn!("external content rejected: {}", e);
        }
        self.flush_changes();
    }

    fn poll_remote(&mut self) {
        let Some(sync) = self.sync.as_mut() else {
            return;
        };
        for steps in sync.poll() {
            let mut tr = Transaction::new(Origin::Remote);
            tr.steps = steps;
            if let Err(e) = self.state.dispatch(tr) {
                tracing::warn!("remote change rejected: {}", e);
                self.notices
                    .push(EditorNotice::Toast("Lost sync with collaborators".to_string()));
                continue;
            }
            if self.popover.is_active() {
                self.request_scan();
            }
        }
    }

    fn start_improve(&mut self) {
        let Some(improver) = self.improver.as_mut() else {
            self.notices
                .push(EditorNotice::Toast("Improve is not available".to_string()));
            return;
        };
        if let Err(e) = improver.start(&self.state) {
            self.notices.push(EditorNotice::Toast(e.to_string()));
        }
    }

    fn popover_hit(&self, at: Coords) -> Option<usize> {
        let placement = self.popover_placement()?;
        self.popover.hit_test(&placement, at)
    }

    /// Broadcast local changes and tell the host about them, unless an
    /// external update is in flight.
    fn flush_changes(&mut self) {
        for change in self.state.take_changes() {
            if change.origin.broadcasts()
                && let Some(sync) = self.sync.as_mut()
            {
                sync.send(&change.steps);
            }
            if self.guards.is_external_update() {
                tracing::trace!(version = change.version, "change notice suppressed");
                if !matches!(change.origin, Origin::External | Origin::Remote) {
                    self.withheld = Some((change.version, change.origin));
                }
                continue;
            }
            self.notices.push(EditorNotice::Changed {
                version: change.version,
                origin: change.origin,
            });
        }
    }
}
