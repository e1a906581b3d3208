use unicode_segmentation::UnicodeSegmentation;

use crate::model::{BlockKind, Document, Inline};
use crate::util::unicode;

/// Screen coordinates in cells, relative to the editor container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coords {
    pub top: usize,
    pub left: usize,
}

/// One rendered unit: a grapheme of text or a whole mention chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Document position where the unit starts
    pub pos: usize,
    /// Number of positions the unit covers
    pub size: usize,
    pub text: String,
    pub width: usize,
    pub mention: bool,
}

/// A single visual row produced by wrapping a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualRow {
    pub block: usize,
    pub kind: BlockKind,
    pub units: Vec<Unit>,
    /// Position where the row's content starts
    pub start: usize,
    /// Position where the containing block ends
    pub block_end: usize,
    /// True for the final row of a block
    pub last_in_block: bool,
}

impl VisualRow {
    pub fn width(&self) -> usize {
        self.units.iter().map(|u| u.width).sum()
    }
}

/// Lay the document out in rows no wider than `width` cells.
/// A unit wider than the row still gets a row to itself.
pub fn layout(doc: &Document, width: usize) -> Vec<VisualRow> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut start = 0;
    for (block_idx, block) in doc.blocks().iter().enumerate() {
        let block_end = start + block.size();
        let mut units = Vec::new();
        let mut pos = start;
        for node in &block.content {
            match node {
                Inline::Text(s) => {
                    for g in s.graphemes(true) {
                        let size = g.chars().count();
                        units.push(Unit {
                            pos,
                            size,
                            text: g.to_string(),
                            width: unicode::grapheme_display_width(g),
                            mention: false,
                        });
                        pos += size;
                    }
                }
                Inline::Mention(m) => {
                    let text = m.render_text();
                    units.push(Unit {
                        pos,
                        size: 1,
                        width: unicode::display_width(&text),
                        text,
                        mention: true,
                    });
                    pos += 1;
                }
            }
        }

        let mut row = VisualRow {
            block: block_idx,
            kind: block.kind,
            units: Vec::new(),
            start,
            block_end,
            last_in_block: false,
        };
        let mut col = 0;
        for unit in units {
            if col > 0 && col + unit.width > width {
                let next_start = unit.pos;
                rows.push(std::mem::replace(
                    &mut row,
                    VisualRow {
                        block: block_idx,
                        kind: block.kind,
                        units: Vec::new(),
                        start: next_start,
                        block_end,
                        last_in_block: false,
                    },
                ));
                col = 0;
            }
            col += unit.width;
            row.units.push(unit);
        }
        row.last_in_block = true;
        rows.push(row);
        start = block_end + 1;
    }
    rows
}

/// Cell coordinates of the caret at `pos`
pub fn coords_at_pos(doc: &Document, pos: usize, width: usize) -> Coords {
    let rows = layout(doc, width);
    coords_in_rows(&rows, pos)
}

pub fn coords_in_rows(rows: &[VisualRow], pos: usize) -> Coords {
    for (top, row) in rows.iter().enumerate() {
        let mut left = 0;
        for unit in &row.units {
            if pos <= unit.pos {
                return Coords { top, left };
            }
            left += unit.width;
        }
        if row.last_in_block && pos <= row.block_end {
            return Coords { top, left };
        }
    }
    // Past the end: clamp to the end of the last row
    rows.last().map_or(Coords::default(), |row| Coords {
        top: rows.len() - 1,
        left: row.width(),
    })
}

/// The unit drawn at the given cell, if any
pub fn unit_at(rows: &[VisualRow], coords: Coords) -> Option<&Unit> {
    let row = rows.get(coords.top)?;
    let mut left = 0;
    for unit in &row.units {
        if coords.left < left + unit.width {
            return Some(unit);
        }
        left += unit.width;
    }
    None
}

/// Document position closest to the given cell
pub fn pos_at_coords(doc: &Document, coords: Coords, width: usize) -> usize {
    let rows = layout(doc, width);
    let Some(row) = rows.get(coords.top.min(rows.len().saturating_sub(1))) else {
        return 0;
    };
    let mut left = 0;
    for unit in &row.units {
        if coords.left < left + unit.width.max(1) {
            // Clicking the right half of a unit lands after it
            return if coords.left - left >= unit.width.div_ceil(2) && unit.width > 1 {
                unit.pos + unit.size
            } else {
                unit.pos
            };
        }
        left += unit.width;
    }
    if row.last_in_block {
        row.block_end
    } else {
        row.units.last().map_or(row.start, |u| u.pos + u.size)
    }
}
