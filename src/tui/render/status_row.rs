use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::MentionKind;
use crate::tui::app::App;
use crate::util::unicode::truncate_to_width;

use super::spread;

const HINT: &str = "^E improve  ^Z undo  ^Q quit";
const POPOVER_HINT: &str = "\u{2191}\u{2193} choose  Enter insert  Esc close";

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let fill = Style::default().bg(bg);
    let dim = Style::default().fg(app.theme.dim).bg(bg);

    let popover = app.editor.popover();
    let (left, hint) = if let Some(msg) = &app.status {
        (
            Span::styled(
                truncate_to_width(msg, width),
                Style::default().fg(app.theme.text_bright).bg(bg),
            ),
            HINT,
        )
    } else if let Some(trigger) = popover.trigger() {
        let what = match trigger.kind {
            MentionKind::User => "Mention",
            MentionKind::Issue => "Link issue",
        };
        (
            Span::styled(
                format!("{} {}{}", what, trigger.char, trigger.query),
                Style::default().fg(app.theme.highlight).bg(bg),
            ),
            POPOVER_HINT,
        )
    } else if app.editor.is_improving() {
        (
            Span::styled("Improving...", Style::default().fg(app.theme.yellow).bg(bg)),
            HINT,
        )
    } else {
        (Span::styled("", fill), HINT)
    };

    let line: Line = spread(vec![left], Span::styled(hint, dim), width, fill);
    frame.render_widget(Paragraph::new(line).style(fill), area);
}
