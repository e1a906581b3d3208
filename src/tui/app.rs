use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;

use crate::editor::bridge::Dispatch;
use crate::editor::improve::Tidy;
use crate::editor::issue_link::resolve_issue_url;
use crate::editor::layout::Coords;
use crate::editor::popover::Size;
use crate::editor::suggest::SuggestionSource;
use crate::editor::{EditorEvent, EditorNotice, MentionEditor};
use crate::io::directory::Directory;
use crate::io::watcher::{DraftEvent, DraftWatcher};
use crate::model::{Config, Document, MentionKind, WorkspaceConfig, markup};

use super::input;
use super::render;
use super::theme::Theme;

/// How long the event loop waits for input before running a scheduler turn
const TICK: Duration = Duration::from_millis(50);

/// Main application state
pub struct App {
    pub editor: MentionEditor,
    pub theme: Theme,
    pub should_quit: bool,
    /// Message shown in the status row until the next keypress
    pub status: Option<String>,
    /// First visible document row
    pub scroll: usize,
    /// Editor area from the last render, in terminal cells
    pub editor_area: Rect,
    pub draft: Option<PathBuf>,
    /// Container size last reported to the editor
    container: Option<Size>,
    directory: Arc<Directory>,
    workspace: WorkspaceConfig,
    /// Markup most recently written to or read from the draft file
    last_synced: Option<String>,
}

impl App {
    pub fn new(
        doc: Document,
        config: &Config,
        directory: Arc<Directory>,
        dispatch: Dispatch,
    ) -> Self {
        let source: Arc<dyn SuggestionSource> = directory.clone();
        let editor = MentionEditor::new(doc, config, source, dispatch).with_improve(Arc::new(Tidy));
        App {
            editor,
            theme: Theme::from_config(&config.ui),
            should_quit: false,
            status: None,
            scroll: 0,
            editor_area: Rect::default(),
            draft: None,
            container: None,
            directory,
            workspace: config.workspace.clone(),
            last_synced: None,
        }
    }

    /// Attach a draft file. Its markup is remembered so our own saves are
    /// not mistaken for outside edits.
    pub fn with_draft(mut self, path: PathBuf, text: Option<String>) -> Self {
        self.draft = Some(path);
        self.last_synced = text;
        self
    }

    /// Current content as markup
    pub fn markup(&self) -> String {
        markup::serialize(self.editor.doc())
    }

    /// Handle an editor event and everything it produced
    pub fn dispatch(&mut self, event: EditorEvent, now: Instant) -> bool {
        let handled = self.editor.dispatch(event, now);
        self.process_notices();
        handled
    }

    /// One scheduler turn
    pub fn tick(&mut self, now: Instant) {
        self.editor.tick(now);
        self.process_notices();
    }

    pub fn process_notices(&mut self) {
        let mut changed = false;
        for notice in self.editor.take_notices() {
            match notice {
                EditorNotice::Changed { .. } => changed = true,
                EditorNotice::Toast(msg) => self.status = Some(msg),
                EditorNotice::UploadRequested { name, mime, .. } => {
                    self.status = Some(format!("Uploads are not supported here ({} {})", name, mime));
                }
            }
        }
        if changed {
            self.save_draft();
        }
    }

    /// Write the draft file if the content differs from what it holds
    pub fn save_draft(&mut self) {
        let Some(path) = self.draft.clone() else {
            return;
        };
        let text = self.markup();
        if self.last_synced.as_deref() == Some(text.as_str()) {
            return;
        }
        match fs::write(&path, &text) {
            Ok(()) => self.last_synced = Some(text),
            Err(e) => {
                tracing::warn!(path = %path.display(), "draft save failed: {}", e);
                self.status = Some(format!("Could not save draft: {}", e));
            }
        }
    }

    /// Pick up an outside edit of the draft file
    pub fn reload_draft(&mut self, now: Instant) {
        let Some(path) = self.draft.clone() else {
            return;
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %path.display(), "draft reload skipped: {}", e);
                return;
            }
        };
        if self.last_synced.as_deref() == Some(text.as_str()) {
            return;
        }
        tracing::debug!(path = %path.display(), "draft changed on disk");
        self.editor.set_content(markup::parse(&text), now);
        self.last_synced = Some(text);
        self.process_notices();
    }

    /// Show where the mention chip under the pointer leads
    pub fn describe_mention(&mut self, at: Coords) -> bool {
        let Some(node) = self.editor.mention_at(at) else {
            return false;
        };
        let msg = match node.kind {
            MentionKind::User => format!("@{} ({})", node.label, node.id),
            MentionKind::Issue => {
                resolve_issue_url(&node.label, &*self.directory, &self.workspace)
            }
        };
        self.status = Some(msg);
        true
    }

    /// Convert a terminal cell to document coordinates, if it lies in the
    /// editor area
    pub fn to_doc_coords(&self, column: u16, row: u16) -> Option<Coords> {
        let area = self.editor_area;
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        inside.then(|| Coords {
            top: (row - area.y) as usize + self.scroll,
            left: (column - area.x) as usize,
        })
    }

    /// Tell the editor about the current editor area. The container is
    /// measured in document rows so the popover clamps to the visible window.
    pub fn sync_viewport(&mut self, now: Instant) {
        let size = Size {
            width: self.editor_area.width as usize,
            height: self.editor_area.height as usize + self.scroll,
        };
        if size.width == 0 || self.container == Some(size) {
            return;
        }
        self.container = Some(size);
        self.dispatch(EditorEvent::Resize(size), now);
    }
}

/// Run the composer until the user quits. Returns the final markup.
pub fn run(
    config: &Config,
    directory: Directory,
    draft: Option<&Path>,
) -> Result<String, Box<dyn std::error::Error>> {
    let (doc, text) = match draft {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => (markup::parse(&text), Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (Document::default(), None),
            Err(e) => return Err(e.into()),
        },
        None => (Document::default(), None),
    };

    let mut app = App::new(doc, config, Arc::new(directory), Dispatch::Thread);
    let watcher = match draft {
        Some(path) => {
            app = app.with_draft(path.to_path_buf(), text);
            match DraftWatcher::start(path) {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cannot watch draft: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            DisableBracketedPaste,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, watcher.as_ref());

    app.save_draft();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result.map(|()| app.markup())
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    watcher: Option<&DraftWatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;
        app.sync_viewport(Instant::now());

        if event::poll(TICK)? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    input::handle_key(app, key, now)
                }
                Event::Paste(text) => input::handle_paste(app, text, now),
                Event::Mouse(mouse) => input::handle_mouse(app, mouse, now),
                _ => {}
            }
        }

        let now = Instant::now();
        if let Some(watcher) = watcher {
            for evt in watcher.poll() {
                match evt {
                    DraftEvent::Changed(_) => app.reload_draft(now),
                    DraftEvent::Removed(path) => {
                        app.status = Some(format!("Draft {} was removed", path.display()));
                    }
                }
            }
        }
        app.tick(now);

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
