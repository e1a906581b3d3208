use ratatui::style::Color;

use crate::model::{IssueType, MentionKind, UiConfig};

/// Parsed color theme for the composer
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    pub highlight: Color,
    pub dim: Color,
    pub red: Color,
    pub yellow: Color,
    pub green: Color,
    pub cyan: Color,
    pub purple: Color,
    pub blue: Color,
    pub heading: Color,
    pub selection_bg: Color,
    pub popover_border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::Rgb(0x0C, 0x00, 0x1B),
            text: Color::Rgb(0xB0, 0xAA, 0xFF),
            text_bright: Color::Rgb(0xFF, 0xFF, 0xFF),
            highlight: Color::Rgb(0xFB, 0x41, 0x96),
            dim: Color::Rgb(0x7D, 0x78, 0xBF),
            red: Color::Rgb(0xFF, 0x44, 0x44),
            yellow: Color::Rgb(0xFF, 0xD7, 0x00),
            green: Color::Rgb(0x44, 0xFF, 0x88),
            cyan: Color::Rgb(0x44, 0xDD, 0xFF),
            purple: Color::Rgb(0xCC, 0x66, 0xFF),
            blue: Color::Rgb(0x44, 0x88, 0xFF),
            heading: Color::Rgb(0xFF, 0xFF, 0xFF),
            selection_bg: Color::Rgb(0x3D, 0x14, 0x38),
            popover_border: Color::Rgb(0x7D, 0x78, 0xBF),
        }
    }
}

/// Parse a hex color string like "#FF4444" into an RGB Color
fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

impl Theme {
    /// Create a theme from the `[ui]` config, falling back to defaults
    pub fn from_config(ui: &UiConfig) -> Self {
        let mut theme = Theme::default();
        for (key, value) in &ui.colors {
            let Some(color) = parse_hex_color(value) else {
                tracing::warn!(slot = %key, value = %value, "ignoring invalid theme color");
                continue;
            };
            match key.as_str() {
                "background" => theme.background = color,
                "text" => theme.text = color,
                "text_bright" => theme.text_bright = color,
                "highlight" => theme.highlight = color,
                "dim" => theme.dim = color,
                "red" => theme.red = color,
                "yellow" => theme.yellow = color,
                "green" => theme.green = color,
                "cyan" => theme.cyan = color,
                "purple" => theme.purple = color,
                "blue" => theme.blue = color,
                "heading" => theme.heading = color,
                "selection_bg" => theme.selection_bg = color,
                "popover_border" => theme.popover_border = color,
                _ => tracing::warn!(slot = %key, "unknown theme slot"),
            }
        }
        theme
    }

    /// Chip color for a mention
    pub fn mention_color(&self, kind: MentionKind) -> Color {
        match kind {
            MentionKind::User => self.cyan,
            MentionKind::Issue => self.purple,
        }
    }

    /// Color for the issue type badge in the suggestion list
    pub fn issue_type_color(&self, issue_type: IssueType) -> Color {
        match issue_type {
            IssueType::Bug => self.red,
            IssueType::Epic => self.purple,
            IssueType::Story => self.green,
            IssueType::Milestone => self.yellow,
            IssueType::Task | IssueType::Subtask => self.blue,
        }
    }
}
