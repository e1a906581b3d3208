use std::sync::LazyLock;

use regex::Regex;

use super::document::{Block, BlockKind, Document, Inline};
use super::mention::{IssueType, MentionKind, MentionNode};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6}) (.*)$").expect("valid heading regex"));

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?P<trig>[@#])\[(?P<label>[^\]\n]*)\]\((?P<scheme>user|issue):(?P<id>[^\s)"]*)(?: "(?P<title>[^"\n]*)")?(?: (?P<ty>[A-Za-z]+))?\)"#,
    )
    .expect("valid mention regex")
});

/// Parse markup into a document. Never fails: unrecognized syntax stays text.
///
/// One block per line, `# ` to `###### ` making headings. Mentions read as
/// `@[label](user:id)` and `#[label](issue:id "title" TYPE)`.
pub fn parse(text: &str) -> Document {
    let text = text.strip_suffix('\n').unwrap_or(text);
    Document::new(text.split('\n').map(parse_line).collect())
}

fn parse_line(line: &str) -> Block {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if let Some(caps) = HEADING_RE.captures(line) {
        let level = caps[1].len() as u8;
        let body = caps.get(2).map_or("", |m| m.as_str());
        return Block::new(BlockKind::Heading(level), parse_inlines(body));
    }
    Block::new(BlockKind::Paragraph, parse_inlines(line))
}

fn parse_inlines(text: &str) -> Vec<Inline> {
    let mut content = Vec::new();
    let mut last = 0;
    for caps in MENTION_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let kind = match (&caps["trig"], &caps["scheme"]) {
            ("@", "user") => MentionKind::User,
            ("#", "issue") => MentionKind::Issue,
            _ => continue,
        };
        content.push(Inline::Text(text[last..whole.start()].to_string()));
        let (title, issue_type) = match kind {
            MentionKind::User => (None, None),
            MentionKind::Issue => (
                caps.name("title").map(|m| m.as_str().to_string()),
                Some(
                    caps.name("ty")
                        .and_then(|m| IssueType::parse(m.as_str()))
                        .unwrap_or_default(),
                ),
            ),
        };
        content.push(Inline::Mention(MentionNode {
            kind,
            id: caps["id"].to_string(),
            label: caps["label"].to_string(),
            title,
            issue_type,
        }));
        last = whole.end();
    }
    content.push(Inline::Text(text[last..].to_string()));
    content
}

/// Serialize a document back into markup
pub fn serialize(doc: &Document) -> String {
    doc.blocks()
        .iter()
        .map(serialize_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn serialize_block(block: &Block) -> String {
    let mut out = String::new();
    if let BlockKind::Heading(level) = block.kind {
        out.push_str(&"#".repeat(level.clamp(1, 6) as usize));
        out.push(' ');
    }
    for node in &block.content {
        match node {
            Inline::Text(s) => out.push_str(s),
            Inline::Mention(m) => out.push_str(&serialize_mention(m)),
        }
    }
    out
}

fn serialize_mention(m: &MentionNode) -> String {
    let label = m.label.replace([']', '\n'], " ");
    let id: String = m
        .id
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ')' && *c != '"')
        .collect();
    match m.kind {
        MentionKind::User => format!("@[{}](user:{})", label, id),
        MentionKind::Issue => {
            let mut s = format!("#[{}](issue:{}", label, id);
            if let Some(title) = &m.title {
                s.push_str(&format!(" \"{}\"", title.replace(['"', '\n'], "'")));
            }
            if let Some(ty) = m.issue_type {
                s.push(' ');
                s.push_str(ty.as_str());
            }
            s.push(')');
            s
        }
    }
}
