use serde::{Deserialize, Serialize};

/// Characters that open mention-suggestion mode.
pub const TRIGGER_CHARS: [char; 2] = ['@', '#'];

/// Which entity a mention refers to. Derived 1:1 from the trigger character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    User,
    Issue,
}

impl MentionKind {
    /// The character that opens this kind of mention
    pub fn trigger_char(self) -> char {
        match self {
            MentionKind::User => '@',
            MentionKind::Issue => '#',
        }
    }

    /// Map a trigger character back to its mention kind
    pub fn from_trigger(c: char) -> Option<MentionKind> {
        match c {
            '@' => Some(MentionKind::User),
            '#' => Some(MentionKind::Issue),
            _ => None,
        }
    }

    fn unknown_label(self) -> &'static str {
        match self {
            MentionKind::User => "Unknown User",
            MentionKind::Issue => "Unknown Issue",
        }
    }
}

/// Issue type carried by issue mentions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueType {
    #[default]
    Task,
    Epic,
    Story,
    Milestone,
    Bug,
    Subtask,
}

impl IssueType {
    pub const ALL: [IssueType; 6] = [
        IssueType::Task,
        IssueType::Epic,
        IssueType::Story,
        IssueType::Milestone,
        IssueType::Bug,
        IssueType::Subtask,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Task => "TASK",
            IssueType::Epic => "EPIC",
            IssueType::Story => "STORY",
            IssueType::Milestone => "MILESTONE",
            IssueType::Bug => "BUG",
            IssueType::Subtask => "SUBTASK",
        }
    }

    /// Case-insensitive parse. Unknown names yield None.
    pub fn parse(s: &str) -> Option<IssueType> {
        let s = s.trim();
        IssueType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

/// The atomic inline node inserted in place of a typed trigger span.
/// Attributes are immutable: changing a mention means delete-and-reinsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionNode {
    pub kind: MentionKind,
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
}

impl MentionNode {
    /// Text shown for the node (`@label` or `#label`)
    pub fn render_text(&self) -> String {
        format!("{}{}", self.kind.trigger_char(), self.label)
    }
}

/// Untyped candidate payload as returned by a suggestion backend.
/// Every field is optional; `normalize` turns it into a `MentionCandidate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidatePayload {
    pub id: Option<String>,
    pub label: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCandidate {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueCandidate {
    pub id: String,
    pub label: String,
    pub title: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
}

/// A resolved entity offered for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MentionCandidate {
    User(UserCandidate),
    Issue(IssueCandidate),
}

impl MentionCandidate {
    /// Normalize an untyped payload for the given mention kind.
    ///
    /// Label fallback order: label, name, then email (users) or title
    /// (issues), then a literal "Unknown User" / "Unknown Issue". Empty
    /// strings count as missing. A missing id becomes the empty string.
    pub fn normalize(kind: MentionKind, payload: CandidatePayload) -> MentionCandidate {
        let id = payload.id.unwrap_or_default();
        match kind {
            MentionKind::User => {
                let label = first_non_empty([&payload.label, &payload.name, &payload.email])
                    .unwrap_or_else(|| kind.unknown_label().to_string());
                MentionCandidate::User(UserCandidate {
                    id,
                    label,
                    email: payload.email.filter(|e| !e.trim().is_empty()),
                })
            }
            MentionKind::Issue => {
                let label = first_non_empty([&payload.label, &payload.name, &payload.title])
                    .unwrap_or_else(|| kind.unknown_label().to_string());
                let title = first_non_empty([&payload.title]).unwrap_or_else(|| label.clone());
                let issue_type = payload
                    .issue_type
                    .as_deref()
                    .and_then(IssueType::parse)
                    .unwrap_or_default();
                MentionCandidate::Issue(IssueCandidate {
                    id,
                    label,
                    title,
                    issue_type,
                })
            }
        }
    }

    pub fn kind(&self) -> MentionKind {
        match self {
            MentionCandidate::User(_) => MentionKind::User,
            MentionCandidate::Issue(_) => MentionKind::Issue,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            MentionCandidate::User(u) => &u.id,
            MentionCandidate::Issue(i) => &i.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            MentionCandidate::User(u) => &u.label,
            MentionCandidate::Issue(i) => &i.label,
        }
    }

    /// Secondary text shown next to the label in the suggestion list
    pub fn detail(&self) -> Option<String> {
        match self {
            MentionCandidate::User(u) => u.email.clone(),
            MentionCandidate::Issue(i) => Some(format!("{} {}", i.issue_type.as_str(), i.title)),
        }
    }

    /// Build the mention node carried into the document
    pub fn to_node(&self) -> MentionNode {
        match self {
            MentionCandidate::User(u) => MentionNode {
                kind: MentionKind::User,
                id: u.id.clone(),
                label: u.label.clone(),
                title: None,
                issue_type: None,
            },
            MentionCandidate::Issue(i) => MentionNode {
                kind: MentionKind::Issue,
                id: i.id.clone(),
                label: i.label.clone(),
                title: Some(i.title.clone()),
                issue_type: Some(i.issue_type),
            },
        }
    }
}

fn first_non_empty<const N: usize>(fields: [&Option<String>; N]) -> Option<String> {
    fields
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
}
