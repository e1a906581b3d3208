use std::sync::Arc;

use crate::model::{CandidatePayload, MentionCandidate, MentionKind};

use super::bridge::{Bridge, Dispatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("suggestion backend unavailable: {0}")]
    Unavailable(String),
    #[error("suggestion backend failed: {0}")]
    Backend(String),
}

/// Where candidates come from. Implementations may block; they are called
/// from the bridge, never from the keystroke path.
pub trait SuggestionSource: Send + Sync {
    fn search_users(
        &self,
        query: &str,
        scope: Option<&str>,
    ) -> Result<Vec<CandidatePayload>, SourceError>;

    fn search_issues(&self, query: &str) -> Result<Vec<CandidatePayload>, SourceError>;
}

/// A fetch the popover wants issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub kind: MentionKind,
    pub query: String,
}

/// A completed fetch, already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub generation: u64,
    pub query: String,
    pub result: Result<Vec<MentionCandidate>, SourceError>,
}

/// Run a source synchronously and normalize what it returns
pub fn fetch(
    source: &dyn SuggestionSource,
    kind: MentionKind,
    query: &str,
    scope: Option<&str>,
) -> Result<Vec<MentionCandidate>, SourceError> {
    let payloads = match kind {
        MentionKind::User => source.search_users(query, scope)?,
        MentionKind::Issue => source.search_issues(query)?,
    };
    Ok(payloads
        .into_iter()
        .map(|p| MentionCandidate::normalize(kind, p))
        .collect())
}

/// Issues fetches on the bridge and collects their responses
pub struct Suggestions {
    source: Arc<dyn SuggestionSource>,
    scope: Option<String>,
    bridge: Bridge<FetchResponse>,
}

impl Suggestions {
    pub fn new(source: Arc<dyn SuggestionSource>, scope: Option<String>, dispatch: Dispatch) -> Self {
        Suggestions {
            source,
            scope,
            bridge: Bridge::new(dispatch),
        }
    }

    pub fn request(&self, req: FetchRequest) {
        let source = Arc::clone(&self.source);
        let scope = self.scope.clone();
        tracing::debug!(generation = req.generation, query = %req.query, "fetching suggestions");
        self.bridge.spawn(move || FetchResponse {
            result: fetch(source.as_ref(), req.kind, &req.query, scope.as_deref()),
            generation: req.generation,
            query: req.query,
        });
    }

    pub fn drain(&self) -> Vec<FetchResponse> {
        self.bridge.try_recv_all()
    }
}

impl std::fmt::Debug for Suggestions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suggestions")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
