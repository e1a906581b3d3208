use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::editor::popover::PopoverState;
use crate::model::MentionCandidate;
use crate::tui::app::App;
use crate::util::unicode::{display_width, truncate_to_width};

/// Render the suggestion popover floating below the caret
pub fn render_popover(frame: &mut Frame, app: &App, area: Rect) {
    let Some(placement) = app.editor.popover_placement() else {
        return;
    };
    let Some(top) = placement.top.checked_sub(app.scroll) else {
        return;
    };
    let popup_area = Rect::new(
        area.x + placement.left as u16,
        area.y + top as u16,
        placement.width as u16,
        placement.height as u16,
    )
    .intersection(area);
    if popup_area.width < 3 || popup_area.height < 3 {
        return;
    }

    let theme = &app.theme;
    let bg = theme.background;
    let popover = app.editor.popover();
    let inner = (popup_area.width as usize).saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    match popover.state() {
        PopoverState::Closed => return,
        PopoverState::Loading => lines.push(Line::from(Span::styled(
            " Searching...",
            Style::default().fg(theme.dim).bg(bg),
        ))),
        PopoverState::Open if popover.shows_no_results() => lines.push(Line::from(
            Span::styled(" No results", Style::default().fg(theme.dim).bg(bg)),
        )),
        PopoverState::Open => {
            let offset = popover.scroll_offset();
            for (i, candidate) in popover
                .candidates()
                .iter()
                .enumerate()
                .skip(offset)
                .take(popover.visible_rows())
            {
                let is_selected = popover.selected() == Some(i);
                lines.push(entry_line(app, candidate, is_selected, inner));
            }
        }
    }

    frame.render_widget(Clear, popup_area);

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.popover_border).bg(bg))
        .style(Style::default().bg(bg));
    if let Some(trigger) = popover.trigger() {
        block = block.title(format!(" {}{} ", trigger.char, trigger.query));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(bg));
    frame.render_widget(paragraph, popup_area);
}

fn entry_line<'a>(
    app: &App,
    candidate: &MentionCandidate,
    is_selected: bool,
    width: usize,
) -> Line<'a> {
    let theme = &app.theme;
    let row_bg = if is_selected {
        theme.selection_bg
    } else {
        theme.background
    };
    let label_style = if is_selected {
        Style::default()
            .fg(theme.text_bright)
            .bg(row_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text).bg(row_bg)
    };
    let dim = Style::default().fg(theme.dim).bg(row_bg);

    let prefix = if is_selected { " \u{25B8} " } else { "   " };
    let mut used = display_width(prefix);
    let label = truncate_to_width(candidate.label(), width.saturating_sub(used));
    used += display_width(&label);
    let mut spans = vec![
        Span::styled(prefix, label_style),
        Span::styled(label, label_style),
    ];

    let detail: Vec<(String, Style)> = match candidate {
        MentionCandidate::User(u) => u
            .email
            .iter()
            .map(|e| (e.clone(), dim))
            .collect(),
        MentionCandidate::Issue(issue) => vec![
            (
                issue.issue_type.as_str().to_string(),
                Style::default()
                    .fg(theme.issue_type_color(issue.issue_type))
                    .bg(row_bg),
            ),
            (issue.title.clone(), dim),
        ],
    };
    for (text, style) in detail {
        let room = width.saturating_sub(used + 1);
        if room < 2 {
            break;
        }
        let text = truncate_to_width(&text, room);
        used += 1 + display_width(&text);
        spans.push(Span::styled(" ", dim));
        spans.push(Span::styled(text, style));
    }
    if used < width {
        spans.push(Span::styled(" ".repeat(width - used), dim));
    }
    Line::from(spans)
}
