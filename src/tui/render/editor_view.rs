use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::editor::layout::{self, Unit, VisualRow};
use crate::model::{BlockKind, MentionKind};
use crate::tui::app::App;

const PLACEHOLDER: &str = "Write a comment. @ mentions people, # links issues.";

/// Render the document, keeping the caret row in view
pub fn render_editor(frame: &mut Frame, app: &mut App, area: Rect) {
    app.editor_area = area;
    let bg = app.theme.background;
    let height = area.height as usize;
    let caret = app.editor.caret_coords();

    if height > 0 {
        if caret.top < app.scroll {
            app.scroll = caret.top;
        } else if caret.top >= app.scroll + height {
            app.scroll = caret.top + 1 - height;
        }
    }

    if app.editor.doc().size() == 0 {
        let line = Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(app.theme.dim).bg(bg),
        ));
        frame.render_widget(Paragraph::new(line).style(Style::default().bg(bg)), area);
    } else {
        let rows = layout::layout(app.editor.doc(), app.editor.state().viewport_width());
        let lines: Vec<Line> = rows
            .iter()
            .skip(app.scroll)
            .take(height)
            .map(|row| row_line(app, row))
            .collect();
        frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
    }

    let top = caret.top.saturating_sub(app.scroll);
    if caret.top >= app.scroll && top < height && caret.left < area.width as usize {
        frame.set_cursor_position(Position::new(
            area.x + caret.left as u16,
            area.y + top as u16,
        ));
    }
}

fn row_line<'a>(app: &App, row: &'a VisualRow) -> Line<'a> {
    let theme = &app.theme;
    let sel = app.editor.selection();
    let trigger_span = app
        .editor
        .popover()
        .trigger()
        .map(|t| (t.position, t.span_end()));

    let base = match row.kind {
        BlockKind::Heading(_) => Style::default()
            .fg(theme.heading)
            .bg(theme.background)
            .add_modifier(Modifier::BOLD),
        BlockKind::Paragraph => Style::default().fg(theme.text).bg(theme.background),
    };

    let mut spans: Vec<Span> = Vec::new();
    let mut run = String::new();
    let mut run_style = base;
    for unit in &row.units {
        let mut style = if unit.mention {
            let kind = unit
                .text
                .chars()
                .next()
                .and_then(MentionKind::from_trigger)
                .unwrap_or(MentionKind::User);
            base.fg(theme.mention_color(kind)).add_modifier(Modifier::BOLD)
        } else {
            base
        };
        if trigger_span.is_some_and(|(from, to)| unit.pos >= from && unit.pos < to) {
            style = style.fg(theme.highlight).add_modifier(Modifier::UNDERLINED);
        }
        if !sel.is_empty() && unit.pos >= sel.from() && unit.pos < sel.to() {
            style = style.bg(theme.selection_bg);
        }
        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;
        push_unit(&mut run, unit);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    Line::from(spans)
}

fn push_unit(out: &mut String, unit: &Unit) {
    if unit.text == "\t" {
        out.push_str(&" ".repeat(unit.width));
    } else {
        out.push_str(&unit.text);
    }
}
