use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::editor::issue_link::IssueLookup;
use crate::editor::suggest::{SourceError, SuggestionSource};
use crate::model::{CandidatePayload, IssueType};

/// Most candidates returned for one query
const MAX_RESULTS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectoryUser {
    pub id: String,
    pub name: Option<String>,
    pub label: Option<String>,
    pub email: Option<String>,
    /// Workspaces the user belongs to; empty means all
    pub workspaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectoryIssue {
    pub key: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub workspace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DirectoryFile {
    users: Vec<DirectoryUser>,
    issues: Vec<DirectoryIssue>,
}

/// Users keyed by id and issues keyed by key, in file order
#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: IndexMap<String, DirectoryUser>,
    issues: IndexMap<String, DirectoryIssue>,
}

impl Directory {
    pub fn load(path: &Path) -> Result<Directory, DirectoryError> {
        let text = fs::read_to_string(path).map_err(|e| DirectoryError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: DirectoryFile = toml::from_str(&text).map_err(|e| DirectoryError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let dir = Directory::from_entries(file.users, file.issues);
        tracing::debug!(
            path = %path.display(),
            users = dir.users.len(),
            issues = dir.issues.len(),
            "directory loaded"
        );
        Ok(dir)
    }

    /// Build from entries. A repeated id or key replaces the earlier entry.
    pub fn from_entries(users: Vec<DirectoryUser>, issues: Vec<DirectoryIssue>) -> Directory {
        let mut dir = Directory::default();
        for user in users {
            if let Some(old) = dir.users.insert(user.id.clone(), user) {
                tracing::warn!(id = %old.id, "duplicate user id in directory");
            }
        }
        for issue in issues {
            if let Some(old) = dir.issues.insert(issue.key.clone(), issue) {
                tracing::warn!(key = %old.key, "duplicate issue key in directory");
            }
        }
        dir
    }

    pub fn users(&self) -> impl Iterator<Item = &DirectoryUser> {
        self.users.values()
    }

    pub fn issues(&self) -> impl Iterator<Item = &DirectoryIssue> {
        self.issues.values()
    }

    pub fn issue(&self, key: &str) -> Option<&DirectoryIssue> {
        self.issues.get(key)
    }
}

/// 0 = prefix of the whole field, 1 = prefix of a later word,
/// 2 = anywhere, None = no match. Case-insensitive.
fn match_rank(field: &str, query: &str) -> Option<u8> {
    let field = field.to_lowercase();
    if field.starts_with(query) {
        Some(0)
    } else if field
        .split(|c: char| c.is_whitespace() || c == '-' || c == '.' || c == '@')
        .any(|word| word.starts_with(query))
    {
        Some(1)
    } else if field.contains(query) {
        Some(2)
    } else {
        None
    }
}

fn best_rank<'a>(fields: impl IntoIterator<Item = Option<&'a str>>, query: &str) -> Option<u8> {
    fields
        .into_iter()
        .flatten()
        .filter_map(|f| match_rank(f, query))
        .min()
}

impl SuggestionSource for Directory {
    fn search_users(
        &self,
        query: &str,
        scope: Option<&str>,
    ) -> Result<Vec<CandidatePayload>, SourceError> {
        let query = query.to_lowercase();
        let mut hits: Vec<(u8, usize, &DirectoryUser)> = self
            .users
            .values()
            .enumerate()
            .filter(|(_, u)| match scope {
                Some(scope) => u.workspaces.is_empty() || u.workspaces.iter().any(|w| w == scope),
                None => true,
            })
            .filter_map(|(i, u)| {
                let fields = [
                    u.label.as_deref(),
                    u.name.as_deref(),
                    u.email.as_deref(),
                    Some(u.id.as_str()),
                ];
                best_rank(fields, &query).map(|rank| (rank, i, u))
            })
            .collect();
        hits.sort_by_key(|&(rank, i, _)| (rank, i));
        Ok(hits
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, _, u)| CandidatePayload {
                id: Some(u.id.clone()),
                label: u.label.clone(),
                name: u.name.clone(),
                email: u.email.clone(),
                ..Default::default()
            })
            .collect())
    }

    fn search_issues(&self, query: &str) -> Result<Vec<CandidatePayload>, SourceError> {
        let query = query.to_lowercase();
        let mut hits: Vec<(u8, usize, &DirectoryIssue)> = self
            .issues
            .values()
            .enumerate()
            .filter_map(|(i, issue)| {
                let fields = [Some(issue.key.as_str()), issue.title.as_deref()];
                best_rank(fields, &query).map(|rank| (rank, i, issue))
            })
            .collect();
        hits.sort_by_key(|&(rank, i, _)| (rank, i));
        Ok(hits
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, _, issue)| CandidatePayload {
                id: Some(issue.key.clone()),
                label: Some(issue.key.clone()),
                title: issue.title.clone(),
                issue_type: issue
                    .issue_type
                    .as_deref()
                    .and_then(IssueType::parse)
                    .map(|t| t.as_str().to_string()),
                ..Default::default()
            })
            .collect())
    }
}

impl IssueLookup for Directory {
    fn issue_workspace(&self, key: &str) -> Option<Option<String>> {
        self.issue(key).map(|issue| issue.workspace.clone())
    }
}
