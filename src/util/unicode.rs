use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells. Tabs count as 4 cells.
pub fn display_width(s: &str) -> usize {
    s.split('\t')
        .enumerate()
        .map(|(i, part)| {
            let w = UnicodeWidthStr::width(part);
            if i > 0 { w + 4 } else { w }
        })
        .sum()
}

/// Display width of a single grapheme cluster. Tabs count as 4.
pub fn grapheme_display_width(g: &str) -> usize {
    if g == "\t" {
        4
    } else {
        UnicodeWidthStr::width(g)
    }
}

/// Truncate a string to fit within `max_cells` terminal cells, appending `…` if truncated.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if max_cells == 0 {
        return String::new();
    }
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells <= 1 {
        return "\u{2026}".to_string();
    }
    let budget = max_cells - 1; // reserve 1 cell for '…'
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let gw = grapheme_display_width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        result.push_str(grapheme);
    }
    result.push('\u{2026}');
    result
}

/// Byte offset of the `char_idx`-th character. Clamps to `s.len()`.
pub fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map_or(s.len(), |(byte, _)| byte)
}

/// Number of characters in the grapheme cluster ending at `char_idx`.
/// Returns 0 at the start of the string.
pub fn grapheme_chars_before(s: &str, char_idx: usize) -> usize {
    let byte = char_to_byte(s, char_idx);
    s[..byte]
        .graphemes(true)
        .next_back()
        .map_or(0, |g| g.chars().count())
}

/// Number of characters in the grapheme cluster starting at `char_idx`.
/// Returns 0 at the end of the string.
pub fn grapheme_chars_after(s: &str, char_idx: usize) -> usize {
    let byte = char_to_byte(s, char_idx);
    s[byte..]
        .graphemes(true)
        .next()
        .map_or(0, |g| g.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // display_width
    // -----------------------------------------------------------------------

    #[test]
    fn display_width_ascii() {
        assert_eq!(display_width("hello"), 5);
    }

    #[test]
    fn display_width_cjk() {
        assert_eq!(display_width("日本"), 4);
    }

    #[test]
    fn display_width_tab() {
        assert_eq!(display_width("a\tb"), 6);
    }

    #[test]
    fn display_width_empty() {
        assert_eq!(display_width(""), 0);
    }

    // -----------------------------------------------------------------------
    // truncate_to_width
    // -----------------------------------------------------------------------

    #[test]
    fn truncate_no_truncation_needed() {
        assert_eq!(truncate_to_width("abc", 5), "abc");
    }

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_to_width("abcdef", 4), "abc\u{2026}");
    }

    #[test]
    fn truncate_cjk_boundary() {
        // "日本語" is 6 cells; budget of 4 leaves room for one wide char + ellipsis
        assert_eq!(truncate_to_width("日本語", 4), "日\u{2026}");
    }

    #[test]
    fn truncate_zero() {
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    // -----------------------------------------------------------------------
    // char / grapheme offsets
    // -----------------------------------------------------------------------

    #[test]
    fn char_to_byte_multibyte() {
        let s = "aé日b";
        assert_eq!(char_to_byte(s, 0), 0);
        assert_eq!(char_to_byte(s, 1), 1);
        assert_eq!(char_to_byte(s, 2), 3);
        assert_eq!(char_to_byte(s, 3), 6);
        assert_eq!(char_to_byte(s, 10), s.len());
    }

    #[test]
    fn grapheme_before_combining() {
        // "e" + combining acute is two chars, one grapheme
        let s = "ae\u{301}";
        assert_eq!(grapheme_chars_before(s, 3), 2);
        assert_eq!(grapheme_chars_before(s, 1), 1);
        assert_eq!(grapheme_chars_before(s, 0), 0);
    }

    #[test]
    fn grapheme_after_combining() {
        let s = "e\u{301}x";
        assert_eq!(grapheme_chars_after(s, 0), 2);
        assert_eq!(grapheme_chars_after(s, 2), 1);
        assert_eq!(grapheme_chars_after(s, 3), 0);
    }
}
