use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the draft watcher to the TUI event loop.
#[derive(Debug, PartialEq, Eq)]
pub enum DraftEvent {
    /// The draft file was written by someone else (or by us).
    Changed(PathBuf),
    /// The draft file was removed.
    Removed(PathBuf),
}

/// Watches a single draft file for outside edits.
pub struct DraftWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<DraftEvent>,
}

impl DraftWatcher {
    /// Start watching `draft`. The parent directory is watched so that
    /// editors that save by rename are still seen.
    pub fn start(draft: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let draft_owned = draft.to_path_buf();
        let dir = draft
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::debug!("draft watcher error: {}", e);
                        return;
                    }
                };
                if !event.paths.iter().any(|p| same_file(p, &draft_owned)) {
                    return;
                }
                let msg = match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {
                        DraftEvent::Changed(draft_owned.clone())
                    }
                    EventKind::Remove(_) => DraftEvent::Removed(draft_owned.clone()),
                    _ => return,
                };
                let _ = tx.send(msg);
            },
            Config::default(),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(DraftWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending draft events.
    /// Bursts of changes collapse into one event per kind.
    pub fn poll(&self) -> Vec<DraftEvent> {
        let mut events: Vec<DraftEvent> = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            if !events.contains(&evt) {
                events.push(evt);
            }
        }
        events
    }
}

/// Event paths are usually absolute even when we were given a relative one
fn same_file(event_path: &Path, draft: &Path) -> bool {
    if event_path == draft {
        return true;
    }
    match (event_path.canonicalize(), draft.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => event_path.file_name() == draft.file_name() && event_path.ends_with(draft),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn same_file_matches_relative_suffix() {
        assert!(same_file(Path::new("/tmp/x/draft.md"), Path::new("/tmp/x/draft.md")));
        assert!(!same_file(Path::new("/tmp/x/other.md"), Path::new("/tmp/x/draft.md")));
    }

    #[test]
    fn reports_writes_to_the_draft() {
        let tmp = TempDir::new().unwrap();
        let draft = tmp.path().join("draft.md");
        std::fs::write(&draft, "a").unwrap();
        let watcher = DraftWatcher::start(&draft).unwrap();
        std::fs::write(tmp.path().join("unrelated.md"), "x").unwrap();
        std::fs::write(&draft, "b").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while Instant::now() < deadline && seen.is_empty() {
            seen = watcher.poll();
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(seen.iter().all(|e| matches!(e, DraftEvent::Changed(p) if p == &draft)));
        assert!(!seen.is_empty());
    }
}
