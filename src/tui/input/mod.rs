use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::editor::{EditorEvent, EditorKey, Payload};

use super::app::App;

/// Composer-level commands that never reach the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Accept the highlighted suggestion; never typed into the document
    Accept,
}

/// What a key press means to the composer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Editor(EditorKey),
    Command(Command),
}

/// Map a terminal key to an editor key or composer command
pub fn map_key(key: KeyEvent) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let action = match (key.code, ctrl) {
        (KeyCode::Char('q') | KeyCode::Char('c'), true) => KeyAction::Command(Command::Quit),
        (KeyCode::Char('z'), true) if shift => KeyAction::Editor(EditorKey::Redo),
        (KeyCode::Char('Z'), true) => KeyAction::Editor(EditorKey::Redo),
        (KeyCode::Char('z'), true) => KeyAction::Editor(EditorKey::Undo),
        (KeyCode::Char('y'), true) => KeyAction::Editor(EditorKey::Redo),
        (KeyCode::Char('e'), true) => KeyAction::Editor(EditorKey::Improve),
        (KeyCode::Char(_), true) => return None,
        (KeyCode::Char(c), false) => KeyAction::Editor(EditorKey::Char(c)),
        (KeyCode::Enter, _) => KeyAction::Editor(EditorKey::Enter),
        (KeyCode::Backspace, _) => KeyAction::Editor(EditorKey::Backspace),
        (KeyCode::Delete, _) => KeyAction::Editor(EditorKey::Delete),
        (KeyCode::Left, _) => KeyAction::Editor(EditorKey::Left),
        (KeyCode::Right, _) => KeyAction::Editor(EditorKey::Right),
        (KeyCode::Up, _) => KeyAction::Editor(EditorKey::Up),
        (KeyCode::Down, _) => KeyAction::Editor(EditorKey::Down),
        (KeyCode::Home, _) => KeyAction::Editor(EditorKey::Home),
        (KeyCode::End, _) => KeyAction::Editor(EditorKey::End),
        (KeyCode::Esc, _) => KeyAction::Editor(EditorKey::Escape),
        (KeyCode::Tab, _) => KeyAction::Command(Command::Accept),
        _ => return None,
    };
    Some(action)
}

/// Handle a key event
pub fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }
    app.status = None;

    match map_key(key) {
        Some(KeyAction::Command(Command::Quit)) => app.should_quit = true,
        Some(KeyAction::Command(Command::Accept)) => {
            if app.editor.popover().is_active() {
                app.dispatch(EditorEvent::Key(EditorKey::Enter), now);
            }
        }
        Some(KeyAction::Editor(k)) => {
            app.dispatch(EditorEvent::Key(k), now);
        }
        None => {}
    }
}

/// Handle a bracketed paste event
pub fn handle_paste(app: &mut App, text: String, now: Instant) {
    if text.is_empty() {
        return;
    }
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    app.dispatch(EditorEvent::Paste(Payload::Text(text)), now);
}

/// Handle pointer movement and clicks inside the editor area
pub fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    let Some(at) = app.to_doc_coords(mouse.column, mouse.row) else {
        return;
    };
    match mouse.kind {
        MouseEventKind::Moved => {
            app.dispatch(EditorEvent::PointerMove(at), now);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            app.status = None;
            let on_popover = app
                .editor
                .popover_placement()
                .is_some_and(|p| p.contains(at));
            if !on_popover {
                app.describe_mention(at);
            }
            app.dispatch(EditorEvent::PointerDown(at), now);
        }
        _ => {}
    }
}
