//! End-to-end behavior of mention detection and insertion through the
//! public editor API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use threadpad::editor::guard::Guards;
use threadpad::editor::layout::Coords;
use threadpad::editor::popover::PopoverState;
use threadpad::editor::scanner::is_heading_prefix;
use threadpad::editor::{
    DocumentAdapter, DocumentView, Dispatch, EditorEvent, EditorKey, EditorState, InsertOutcome,
    MentionEditor, Origin, ScanOptions, SourceError, SuggestionSource, TriggerMatch,
    insert_mention, scan,
};
use threadpad::model::{
    CandidatePayload, Config, Document, MentionCandidate, MentionKind, MentionNode, Selection,
    TextSpan,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Users whose names start with the query; counts every fetch
#[derive(Default)]
struct Team {
    fetches: AtomicUsize,
}

impl Team {
    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SuggestionSource for Team {
    fn search_users(
        &self,
        query: &str,
        _scope: Option<&str>,
    ) -> Result<Vec<CandidatePayload>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(["Jo", "Joan", "Ann"]
            .into_iter()
            .filter(|n| n.to_lowercase().starts_with(&query.to_lowercase()))
            .map(|n| CandidatePayload {
                id: Some(n.to_lowercase()),
                label: Some(n.to_string()),
                ..Default::default()
            })
            .collect())
    }

    fn search_issues(&self, _query: &str) -> Result<Vec<CandidatePayload>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![CandidatePayload {
            id: Some("PRJ-1".into()),
            label: Some("PRJ-1".into()),
            title: Some("First issue".into()),
            issue_type: Some("TASK".into()),
            ..Default::default()
        }])
    }
}

fn composer(text: &str) -> (MentionEditor, Arc<Team>) {
    let team = Arc::new(Team::default());
    let ed = MentionEditor::new(
        Document::from_text(text),
        &Config::default(),
        team.clone(),
        Dispatch::Inline,
    );
    (ed, team)
}

fn type_str(ed: &mut MentionEditor, text: &str, now: Instant) {
    for c in text.chars() {
        ed.dispatch(EditorEvent::Key(EditorKey::Char(c)), now);
    }
}

fn user(id: &str, label: &str) -> MentionCandidate {
    MentionCandidate::normalize(
        MentionKind::User,
        CandidatePayload {
            id: Some(id.into()),
            label: Some(label.into()),
            ..Default::default()
        },
    )
}

fn issue(key: &str) -> MentionCandidate {
    MentionCandidate::normalize(
        MentionKind::Issue,
        CandidatePayload {
            id: Some(key.into()),
            label: Some(key.into()),
            title: Some("Fix it".into()),
            issue_type: Some("BUG".into()),
            ..Default::default()
        },
    )
}

fn guards() -> Guards {
    Guards::new(1, Duration::from_millis(250))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Scan a single-paragraph document at `cursor`
fn scan_text(text: &str, cursor: usize) -> Option<TriggerMatch> {
    scan(&Document::from_text(text), cursor, &ScanOptions::default())
}

/// Refuses every structured insert; plain text goes through unless
/// `reject_text` is set
struct Rejecting {
    inner: EditorState,
    reject_text: bool,
}

impl DocumentView for Rejecting {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn text_between(&self, from: usize, to: usize) -> String {
        self.inner.text_between(from, to)
    }

    fn text_spans(&self, from: usize, to: usize) -> Vec<TextSpan<'_>> {
        self.inner.text_spans(from, to)
    }
}

impl DocumentAdapter for Rejecting {
    fn selection(&self) -> Selection {
        self.inner.selection()
    }

    fn coords_at_pos(&self, pos: usize) -> Coords {
        DocumentAdapter::coords_at_pos(&self.inner, pos)
    }

    fn delete_range_and_insert_node(&mut self, _from: usize, _to: usize, _node: MentionNode) -> bool {
        false
    }

    fn replace_range_with_text(&mut self, from: usize, to: usize, text: &str) -> bool {
        !self.reject_text && self.inner.replace_range_with_text(from, to, text)
    }

    fn insert_text(&mut self, text: &str, origin: Origin) -> bool {
        !self.reject_text && DocumentAdapter::insert_text(&mut self.inner, text, origin)
    }
}

// ---------------------------------------------------------------------------
// Worked scenarios
// ---------------------------------------------------------------------------

#[test]
fn user_query_at_end_of_line() {
    assert_eq!(
        scan_text("Hello @jo", 9),
        Some(TriggerMatch {
            position: 6,
            char: '@',
            query: "jo".into(),
            kind: MentionKind::User,
        })
    );
}

#[test]
fn trailing_space_ends_the_query() {
    assert_eq!(scan_text("Hello @jo ", 10), None);
}

#[test]
fn heading_prefix_is_not_an_issue_mention() {
    let doc = Document::from_text("### ");
    assert!(is_heading_prefix(&doc, 4));
    assert_eq!(scan(&doc, 4, &ScanOptions::default()), None);

    let now = Instant::now();
    let (mut ed, team) = composer("");
    type_str(&mut ed, "###", now);
    ed.tick(now);
    assert_eq!(ed.popover().state(), PopoverState::Closed);
    type_str(&mut ed, " ", now);
    ed.tick(now);
    assert_eq!(ed.popover().state(), PopoverState::Closed);
    assert_eq!(team.fetches(), 0);
}

#[test]
fn email_only_candidate_is_labelled_by_email() {
    let now = Instant::now();
    let (mut ed, _team) = composer("cc @");
    let candidate = MentionCandidate::normalize(
        MentionKind::User,
        CandidatePayload {
            id: Some(String::new()),
            label: Some(String::new()),
            name: None,
            email: Some("a@b.com".into()),
            ..Default::default()
        },
    );
    let trigger = ed.scan_now().unwrap();
    assert_eq!(
        ed.insert(&candidate, &trigger, now),
        InsertOutcome::Inserted { at: 3 }
    );
    let mentions = ed.doc().mentions();
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].1.label, "a@b.com");
    assert_eq!(ed.doc().to_plain_text(), "cc @a@b.com");
}

#[test]
fn second_insert_waits_for_the_first_to_settle() {
    let now = Instant::now();
    let (mut ed, _team) = composer("@jo");
    let first = ed.scan_now().unwrap();
    assert_eq!(
        ed.insert(&user("jo", "Jo"), &first, now),
        InsertOutcome::Inserted { at: 0 }
    );

    // Same turn: typing lands but the next insert is refused
    type_str(&mut ed, " @a", now);
    let second = ed.scan_now().unwrap();
    assert_eq!(second.position, 2);
    let before = ed.doc().clone();
    assert_eq!(ed.insert(&user("ann", "Ann"), &second, now), InsertOutcome::Busy);
    assert_eq!(ed.doc(), &before);

    ed.tick(now);
    assert!(!ed.guards().is_inserting_mention());
    assert_eq!(
        ed.insert(&user("ann", "Ann"), &second, now),
        InsertOutcome::Inserted { at: 2 }
    );
    assert_eq!(ed.doc().to_plain_text(), "@Jo @Ann");
}

// ---------------------------------------------------------------------------
// Scanning properties
// ---------------------------------------------------------------------------

const PREFIXES: &[&str] = &["", "Hello ", "x", "@ ", "# done ", "see a@[b] then "];
const QUERIES: &[&str] = &["", "j", "jo", "PRJ-12", "a.b", "ünï"];
const SUFFIXES: &[&str] = &["", " tail", "x@y"];

#[test]
fn scan_returns_the_text_between_trigger_and_caret() {
    for prefix in PREFIXES {
        for trigger in ['@', '#'] {
            for query in QUERIES {
                for suffix in SUFFIXES {
                    let text = format!("{prefix}{trigger}{query}{suffix}");
                    let position = char_len(prefix);
                    let cursor = position + 1 + char_len(query);
                    let found = scan_text(&text, cursor)
                        .unwrap_or_else(|| panic!("no match in {:?} at {}", text, cursor));
                    assert_eq!(found.position, position, "{:?}", text);
                    assert_eq!(found.char, trigger, "{:?}", text);
                    assert_eq!(found.query, *query, "{:?}", text);
                    assert_eq!(found.span_end(), cursor);
                }
            }
        }
    }
}

#[test]
fn scan_finds_a_trigger_just_inside_the_window() {
    let filler = "a".repeat(60);
    let text = format!("{filler}@{}", "b".repeat(49));
    let cursor = char_len(&text);
    assert_eq!(scan_text(&text, cursor).unwrap().position, 60);

    let text = format!("{filler}@{}", "b".repeat(50));
    assert_eq!(scan_text(&text, char_len(&text)), None);
}

#[test]
fn typing_a_space_ends_any_open_query() {
    for prefix in PREFIXES {
        for trigger in ['@', '#'] {
            for query in QUERIES {
                let text = format!("{prefix}{trigger}{query}");
                let mut state = EditorState::new(Document::from_text(&text), 80);
                let cursor = state.selection().head;
                assert!(scan(&state, cursor, &ScanOptions::default()).is_some());

                state.insert(" ", Origin::Typing).unwrap();
                let cursor = state.selection().head;
                assert_eq!(
                    scan(&state, cursor, &ScanOptions::default()),
                    None,
                    "{:?} followed by a space",
                    text
                );
            }
        }
    }
}

#[test]
fn nearest_of_two_triggers_wins() {
    for first in ['@', '#'] {
        for second in ['@', '#'] {
            for between in [" ", " and ", "\t", " x "] {
                let text = format!("{first}ann{between}{second}PR");
                let expected = char_len(&format!("{first}ann{between}"));
                let found = scan_text(&text, char_len(&text)).unwrap();
                assert_eq!(found.position, expected, "{:?}", text);
                assert_eq!(found.char, second);
                assert_eq!(found.query, "PR");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Insertion properties
// ---------------------------------------------------------------------------

#[test]
fn insert_replaces_span_and_undoes_in_one_step() {
    let cases: &[(&str, usize, MentionCandidate)] = &[
        ("Hello @jo", 9, user("jo", "Jo")),
        ("@", 1, user("ann", "Ann")),
        ("a\nb #PRJ-1 x", 10, issue("PRJ-1")),
        ("ping @[x] @an then", 13, user("ann", "Ann")),
    ];
    for (text, cursor, candidate) in cases {
        let original = Document::from_text(text);
        let mut state = EditorState::new(original.clone(), 80);
        state.set_selection(Selection::cursor(*cursor));
        let trigger = scan(&state, *cursor, &ScanOptions::default()).unwrap();
        let mut g = guards();

        let outcome = insert_mention(&mut state, &mut g, 0, Instant::now(), candidate, &trigger);
        assert_eq!(outcome, InsertOutcome::Inserted { at: trigger.position }, "{:?}", text);

        let mentions = state.doc().mentions();
        assert_eq!(mentions.len(), 1, "{:?}", text);
        assert_eq!(mentions[0].0, trigger.position);
        assert_eq!(mentions[0].1, &candidate.to_node());
        assert_eq!(
            state.doc().size(),
            original.size() - (cursor - trigger.position) + 1
        );
        assert_eq!(state.selection(), Selection::cursor(trigger.position + 1));

        assert!(state.undo());
        assert_eq!(state.doc(), &original, "{:?}", text);
    }
}

#[test]
fn undo_after_committing_from_the_popover_restores_the_query() {
    let now = Instant::now();
    let (mut ed, _team) = composer("");
    type_str(&mut ed, "Hi @jo", now);
    ed.tick(now);
    assert_eq!(ed.popover().state(), PopoverState::Open);
    assert!(ed.dispatch(EditorEvent::Key(EditorKey::Enter), now));
    assert_eq!(ed.doc().to_plain_text(), "Hi @Jo");
    assert_eq!(ed.doc().mentions().len(), 1);

    ed.tick(now);
    ed.dispatch(EditorEvent::Key(EditorKey::Undo), now);
    assert_eq!(ed.doc().to_plain_text(), "Hi @jo");
    assert!(ed.doc().mentions().is_empty());
}

#[test]
fn rejected_insert_falls_back_to_text_and_releases_guards() {
    let now = Instant::now();
    let mut doc = Rejecting {
        inner: EditorState::new(Document::from_text("Hi @jo"), 80),
        reject_text: false,
    };
    let trigger = scan(&doc, 6, &ScanOptions::default()).unwrap();
    let mut g = guards();

    let outcome = insert_mention(&mut doc, &mut g, 0, now, &user("jo", "Jo"), &trigger);
    assert_eq!(outcome, InsertOutcome::FellBack { applied: true });
    // The query is replaced, not duplicated
    assert_eq!(doc.inner.doc().to_plain_text(), "Hi @Jo");
    assert_eq!(doc.selection(), Selection::cursor(6));
    assert!(doc.inner.doc().mentions().is_empty());

    assert!(g.is_inserting_mention());
    g.poll(1, now);
    assert!(!g.is_inserting_mention());
    assert!(!g.is_external_update());
}

#[test]
fn rejected_fallback_leaves_document_unchanged() {
    let now = Instant::now();
    let mut doc = Rejecting {
        inner: EditorState::new(Document::from_text("Hi @jo"), 80),
        reject_text: true,
    };
    let original = doc.inner.doc().clone();
    let trigger = scan(&doc, 6, &ScanOptions::default()).unwrap();
    let mut g = guards();

    let outcome = insert_mention(&mut doc, &mut g, 0, now, &user("jo", "Jo"), &trigger);
    assert_eq!(outcome, InsertOutcome::FellBack { applied: false });
    assert_eq!(doc.inner.doc(), &original);

    // No turns arrive; the deadline still clears both flags
    g.poll(0, now + Duration::from_millis(249));
    assert!(g.is_inserting_mention());
    g.poll(0, now + Duration::from_millis(250));
    assert!(!g.is_inserting_mention());
    assert!(!g.is_external_update());
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

#[test]
fn no_fetch_while_an_insert_is_settling() {
    let now = Instant::now();
    let (mut ed, team) = composer("");
    type_str(&mut ed, "@jo", now);
    ed.tick(now);
    assert_eq!(team.fetches(), 1);
    assert!(ed.dispatch(EditorEvent::Key(EditorKey::Enter), now));
    assert!(ed.guards().is_inserting_mention());

    type_str(&mut ed, "@", now);
    ed.tick(now);
    assert_eq!(ed.popover().state(), PopoverState::Closed);
    assert_eq!(team.fetches(), 1);
}

#[test]
fn scan_queued_before_insert_is_dropped() {
    let now = Instant::now();
    let (mut ed, team) = composer("");
    type_str(&mut ed, "@jo", now);
    assert!(ed.has_pending_work());

    let trigger = ed.scan_now().unwrap();
    ed.insert(&user("jo", "Jo"), &trigger, now);
    ed.tick(now);

    assert_eq!(ed.popover().state(), PopoverState::Closed);
    assert_eq!(team.fetches(), 0);
    assert!(!ed.guards().is_inserting_mention());
}

#[test]
fn scanning_resumes_after_release() {
    let now = Instant::now();
    let (mut ed, team) = composer("");
    type_str(&mut ed, "@jo", now);
    ed.tick(now);
    ed.dispatch(EditorEvent::Key(EditorKey::Enter), now);
    ed.tick(now);

    type_str(&mut ed, " #P", now);
    ed.tick(now);
    assert_eq!(ed.popover().state(), PopoverState::Open);
    assert_eq!(ed.popover().trigger().unwrap().kind, MentionKind::Issue);
    assert_eq!(team.fetches(), 2);
}
