use std::sync::Arc;
use std::time::Instant;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::editor::bridge::Dispatch;
use crate::editor::{EditorEvent, EditorKey};
use crate::io::directory::{Directory, DirectoryIssue, DirectoryUser};
use crate::model::{Config, markup};
use crate::tui::app::App;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Render the whole composer screen
pub fn render_app(app: &mut App, w: u16, h: u16) -> String {
    render_to_string(w, h, |frame, _area| super::render(frame, app))
}

/// Two users and two issues, one of them owned by the `acme` workspace
pub fn sample_directory() -> Directory {
    Directory::from_entries(
        vec![
            DirectoryUser {
                id: "u1".into(),
                name: Some("Jo Smith".into()),
                email: Some("jo@example.com".into()),
                ..Default::default()
            },
            DirectoryUser {
                id: "u2".into(),
                name: Some("Ann Jones".into()),
                ..Default::default()
            },
        ],
        vec![
            DirectoryIssue {
                key: "PRJ-12".into(),
                title: Some("Fix login redirect".into()),
                issue_type: Some("bug".into()),
                workspace: None,
            },
            DirectoryIssue {
                key: "PRJ-7".into(),
                title: Some("Project setup".into()),
                issue_type: None,
                workspace: Some("acme".into()),
            },
        ],
    )
}

/// An App over the given markup with inline fetches, caret at the end
pub fn sample_app(text: &str) -> App {
    App::new(
        markup::parse(text),
        &Config::default(),
        Arc::new(sample_directory()),
        Dispatch::Inline,
    )
}

/// Type characters one key at a time
pub fn type_text(app: &mut App, text: &str, now: Instant) {
    for c in text.chars() {
        let key = match c {
            '\n' => EditorKey::Enter,
            c => EditorKey::Char(c),
        };
        app.dispatch(EditorEvent::Key(key), now);
    }
}
