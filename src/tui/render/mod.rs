pub mod editor_view;
pub mod popover;
pub mod status_row;
#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::util::unicode::{display_width, truncate_to_width};

use super::app::App;

/// Main render function, dispatches to sub-renderers
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: header (1 row) | editor | status row (1 row)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    editor_view::render_editor(frame, app, chunks[1]);

    // Popover floats over the editor content
    popover::render_popover(frame, app, chunks[1]);

    status_row::render_status_row(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let title = " threadpad";
    let mut spans = vec![Span::styled(
        title,
        Style::default()
            .fg(app.theme.highlight)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(name) = app.draft.as_ref().and_then(|p| p.file_name()) {
        let name = name.to_string_lossy();
        let room = width.saturating_sub(display_width(title) + 2);
        let name = truncate_to_width(&name, room);
        let padding = width.saturating_sub(display_width(title) + display_width(&name) + 1);
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        spans.push(Span::styled(name, Style::default().fg(app.theme.dim).bg(bg)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}

/// Pad `left` and `right` apart so `right` ends at `width`. Drops `right`
/// when both do not fit.
pub(super) fn spread<'a>(
    mut left: Vec<Span<'a>>,
    right: Span<'a>,
    width: usize,
    fill: Style,
) -> Line<'a> {
    let content_width: usize = left.iter().map(|s| display_width(&s.content)).sum();
    let right_width = display_width(&right.content);
    if content_width + right_width < width {
        let padding = width - content_width - right_width;
        left.push(Span::styled(" ".repeat(padding), fill));
        left.push(right);
    }
    Line::from(left)
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use std::path::PathBuf;

    #[test]
    fn test_full_screen_layout() {
        let mut app = sample_app("Hello").with_draft(PathBuf::from("/tmp/pr-42.md"), None);
        let output = render_app(&mut app, 40, 5);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], " threadpad                     pr-42.md");
        assert_eq!(lines[1], "Hello");
        assert!(lines[4].contains("^Q quit"));
    }
}
