use serde::{Deserialize, Serialize};

use super::mention::MentionNode;
use crate::util::unicode;

/// Placeholder character `text_between` emits for an atomic inline node.
pub const ATOM_CHAR: char = '\u{FFFC}';

/// Block-level node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "level", rename_all = "lowercase")]
pub enum BlockKind {
    #[default]
    Paragraph,
    /// Heading level 1..=6
    Heading(u8),
}

/// An inline node. Text characters have size 1 each; a mention is one atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Mention(MentionNode),
}

impl Inline {
    pub fn size(&self) -> usize {
        match self {
            Inline::Text(s) => s.chars().count(),
            Inline::Mention(_) => 1,
        }
    }
}

/// A block of inline content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub kind: BlockKind,
    pub content: Vec<Inline>,
}

impl Block {
    pub fn new(kind: BlockKind, content: Vec<Inline>) -> Self {
        let mut block = Block { kind, content };
        block.normalize();
        block
    }

    pub fn paragraph(text: &str) -> Self {
        Block::new(BlockKind::Paragraph, vec![Inline::Text(text.to_string())])
    }

    pub fn size(&self) -> usize {
        self.content.iter().map(Inline::size).sum()
    }

    /// Copy of the inline content between two local offsets
    pub fn slice(&self, from: usize, to: usize) -> Vec<Inline> {
        let (_, rest) = split_inlines(self.content.clone(), from);
        let (mid, _) = split_inlines(rest, to.saturating_sub(from));
        mid
    }

    /// Replace the local range `[from, to)` with `content`. Returns what was removed.
    pub fn replace(&mut self, from: usize, to: usize, content: Vec<Inline>) -> Vec<Inline> {
        let (mut head, rest) = split_inlines(std::mem::take(&mut self.content), from);
        let (removed, tail) = split_inlines(rest, to.saturating_sub(from));
        head.extend(content);
        head.extend(tail);
        self.content = head;
        self.normalize();
        normalized(removed)
    }

    /// Split the content at a local offset, keeping the head and returning the tail.
    pub fn split_off(&mut self, at: usize) -> Vec<Inline> {
        let (head, tail) = split_inlines(std::mem::take(&mut self.content), at);
        self.content = normalized(head);
        normalized(tail)
    }

    /// Append inline content at the end of the block
    pub fn append(&mut self, content: Vec<Inline>) {
        self.content.extend(content);
        self.normalize();
    }

    fn normalize(&mut self) {
        self.content = normalized(std::mem::take(&mut self.content));
    }

    /// Local text of the range, with atoms rendered as `ATOM_CHAR`
    fn push_text(&self, from: usize, to: usize, out: &mut String) {
        let mut offset = 0;
        for node in &self.content {
            let size = node.size();
            let (lo, hi) = (from.max(offset), to.min(offset + size));
            if lo < hi {
                match node {
                    Inline::Text(s) => {
                        let a = unicode::char_to_byte(s, lo - offset);
                        let b = unicode::char_to_byte(s, hi - offset);
                        out.push_str(&s[a..b]);
                    }
                    Inline::Mention(_) => out.push(ATOM_CHAR),
                }
            }
            offset += size;
            if offset >= to {
                break;
            }
        }
    }
}

/// Drop empty text nodes and merge adjacent text nodes
fn normalized(content: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(content.len());
    for node in content {
        match node {
            Inline::Text(s) if s.is_empty() => {}
            Inline::Text(s) => {
                if let Some(Inline::Text(prev)) = out.last_mut() {
                    prev.push_str(&s);
                } else {
                    out.push(Inline::Text(s));
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Split inline content at a local offset. Only text nodes can straddle the offset.
fn split_inlines(content: Vec<Inline>, at: usize) -> (Vec<Inline>, Vec<Inline>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut offset = 0;
    for node in content {
        let size = node.size();
        if offset + size <= at {
            left.push(node);
        } else if offset >= at {
            right.push(node);
        } else if let Inline::Text(s) = node {
            let byte = unicode::char_to_byte(&s, at - offset);
            left.push(Inline::Text(s[..byte].to_string()));
            right.push(Inline::Text(s[byte..].to_string()));
        }
        offset += size;
    }
    (left, right)
}

/// A resolved document position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPos {
    /// Index of the containing block
    pub block: usize,
    /// Offset inside the block's content
    pub offset: usize,
    /// Absolute position where the block's content starts
    pub block_start: usize,
}

/// A text node intersecting a queried range, with its absolute start position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan<'a> {
    pub start: usize,
    pub text: &'a str,
}

/// Caret/selection. `anchor == head` is a collapsed cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection {
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Selection { anchor, head }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Clamp both ends into `[0, size]`
    pub fn clamped(self, size: usize) -> Self {
        Selection {
            anchor: self.anchor.min(size),
            head: self.head.min(size),
        }
    }
}

/// The structured document: a non-empty list of blocks.
///
/// Positions count one per text character and one per mention atom, with a
/// single boundary position between consecutive blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new(Vec::new())
    }
}

impl Document {
    /// Build a document. An empty block list becomes one empty paragraph.
    pub fn new(blocks: Vec<Block>) -> Self {
        let mut blocks = blocks;
        if blocks.is_empty() {
            blocks.push(Block::default());
        }
        Document { blocks }
    }

    /// One paragraph per line of plain text
    pub fn from_text(text: &str) -> Self {
        Document::new(text.split('\n').map(Block::paragraph).collect())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn size(&self) -> usize {
        self.blocks.iter().map(Block::size).sum::<usize>() + self.blocks.len() - 1
    }

    /// Absolute start position of a block's content
    pub fn block_start(&self, index: usize) -> usize {
        self.blocks[..index.min(self.blocks.len())]
            .iter()
            .map(|b| b.size() + 1)
            .sum()
    }

    /// Resolve an absolute position. The end of a block belongs to that block.
    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        let mut start = 0;
        for (block, b) in self.blocks.iter().enumerate() {
            let size = b.size();
            if pos <= start + size {
                return Some(ResolvedPos {
                    block,
                    offset: pos - start,
                    block_start: start,
                });
            }
            start += size + 1;
        }
        None
    }

    /// Text in `[from, to)`: exactly `to - from` characters after clamping.
    /// Atoms render as `ATOM_CHAR`, block boundaries as `\n`.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let size = self.size();
        let (from, to) = (from.min(size), to.min(size));
        let mut out = String::new();
        if from >= to {
            return out;
        }
        let mut start = 0;
        let last = self.blocks.len() - 1;
        for (i, block) in self.blocks.iter().enumerate() {
            let end = start + block.size();
            if end > from && start < to {
                block.push_text(from.max(start) - start, to.min(end) - start, &mut out);
            }
            if i < last && end >= from && end < to {
                out.push('\n');
            }
            start = end + 1;
            if start >= to {
                break;
            }
        }
        out
    }

    /// Every text node intersecting `[from, to)`, in document order
    pub fn text_spans(&self, from: usize, to: usize) -> Vec<TextSpan<'_>> {
        let mut spans = Vec::new();
        let mut start = 0;
        for block in &self.blocks {
            let mut offset = start;
            for node in &block.content {
                let size = node.size();
                if let Inline::Text(text) = node
                    && offset < to
                    && offset + size > from
                {
                    spans.push(TextSpan {
                        start: offset,
                        text: text.as_str(),
                    });
                }
                offset += size;
            }
            start = offset + 1;
            if start >= to {
                break;
            }
        }
        spans
    }

    /// The inline node occupying `[pos, pos + 1)`, if any
    pub fn node_at(&self, pos: usize) -> Option<&Inline> {
        let rp = self.resolve(pos)?;
        let mut offset = 0;
        for node in &self.blocks[rp.block].content {
            let size = node.size();
            if rp.offset < offset + size {
                return Some(node);
            }
            offset += size;
        }
        None
    }

    /// All mention nodes with their absolute positions
    pub fn mentions(&self) -> Vec<(usize, &MentionNode)> {
        let mut found = Vec::new();
        let mut start = 0;
        for block in &self.blocks {
            let mut offset = start;
            for node in &block.content {
                if let Inline::Mention(m) = node {
                    found.push((offset, m));
                }
                offset += node.size();
            }
            start = offset + 1;
        }
        found
    }

    /// Plain text with mentions rendered as `@label` / `#label`
    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| {
                b.content
                    .iter()
                    .map(|n| match n {
                        Inline::Text(s) => s.clone(),
                        Inline::Mention(m) => m.render_text(),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mention::MentionKind;

    fn jo() -> MentionNode {
        MentionNode {
            kind: MentionKind::User,
            id: "u1".into(),
            label: "Jo".into(),
            title: None,
            issue_type: None,
        }
    }

    /// "ab@c" + [mention] + "d" / "xyz"
    fn sample() -> Document {
        Document::new(vec![
            Block::new(
                BlockKind::Paragraph,
                vec![
                    Inline::Text("ab@c".into()),
                    Inline::Mention(jo()),
                    Inline::Text("d".into()),
                ],
            ),
            Block::paragraph("xyz"),
        ])
    }

    #[test]
    fn empty_document_has_one_block() {
        let doc = Document::default();
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.size(), 0);
        assert_eq!(doc.text_between(0, 0), "");
    }

    #[test]
    fn size_counts_atoms_and_boundaries() {
        // 4 + 1 + 1 = 6, boundary 1, "xyz" 3
        assert_eq!(sample().size(), 10);
    }

    #[test]
    fn text_between_has_one_char_per_position() {
        let doc = sample();
        let text = doc.text_between(0, doc.size());
        assert_eq!(text, "ab@c\u{FFFC}d\nxyz");
        assert_eq!(text.chars().count(), doc.size());
        assert_eq!(doc.text_between(3, 8), "c\u{FFFC}d\nx");
        assert_eq!(doc.text_between(6, 7), "\n");
    }

    #[test]
    fn text_between_clamps() {
        let doc = Document::from_text("hi");
        assert_eq!(doc.text_between(1, 99), "i");
        assert_eq!(doc.text_between(5, 9), "");
    }

    #[test]
    fn resolve_block_ends_belong_to_block() {
        let doc = sample();
        let rp = doc.resolve(6).unwrap();
        assert_eq!((rp.block, rp.offset), (0, 6));
        let rp = doc.resolve(7).unwrap();
        assert_eq!((rp.block, rp.offset, rp.block_start), (1, 0, 7));
        assert!(doc.resolve(11).is_none());
    }

    #[test]
    fn text_spans_skip_atoms() {
        let doc = sample();
        let spans = doc.text_spans(0, 6);
        assert_eq!(
            spans,
            vec![
                TextSpan {
                    start: 0,
                    text: "ab@c"
                },
                TextSpan {
                    start: 5,
                    text: "d"
                },
            ]
        );
        let spans = doc.text_spans(8, 10);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 7);
    }

    #[test]
    fn replace_splits_and_merges_text() {
        let mut block = Block::paragraph("hello world");
        let removed = block.replace(5, 11, vec![Inline::Text(", there".into())]);
        assert_eq!(removed, vec![Inline::Text(" world".into())]);
        assert_eq!(block.content, vec![Inline::Text("hello, there".into())]);
    }

    #[test]
    fn replace_with_atom() {
        let mut block = Block::paragraph("Hi @jo!");
        block.replace(3, 6, vec![Inline::Mention(jo())]);
        assert_eq!(block.size(), 5);
        assert_eq!(
            block.content,
            vec![
                Inline::Text("Hi ".into()),
                Inline::Mention(jo()),
                Inline::Text("!".into()),
            ]
        );
    }

    #[test]
    fn split_off_multibyte() {
        let mut block = Block::paragraph("日本語");
        let tail = block.split_off(1);
        assert_eq!(block.content, vec![Inline::Text("日".into())]);
        assert_eq!(tail, vec![Inline::Text("本語".into())]);
    }

    #[test]
    fn node_at_and_mentions() {
        let doc = sample();
        assert!(matches!(doc.node_at(4), Some(Inline::Mention(_))));
        assert!(matches!(doc.node_at(0), Some(Inline::Text(_))));
        assert_eq!(doc.mentions().len(), 1);
        assert_eq!(doc.mentions()[0].0, 4);
    }

    #[test]
    fn plain_text_renders_mentions() {
        assert_eq!(sample().to_plain_text(), "ab@c@Jod\nxyz");
    }
}
