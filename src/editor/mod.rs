pub mod adapter;
pub mod bridge;
pub mod collab;
pub mod guard;
pub mod history;
pub mod improve;
pub mod input_rules;
pub mod insertion;
pub mod issue_link;
pub mod layout;
pub mod popover;
pub mod scanner;
pub mod scheduler;
pub mod shim;
pub mod suggest;
pub mod transform;

pub use adapter::{DocumentAdapter, DocumentView, EditorState};
pub use bridge::Dispatch;
pub use insertion::{InsertOutcome, insert_mention};
pub use scanner::{ScanOptions, TriggerMatch, scan};
pub use shim::{EditorEvent, EditorKey, EditorNotice, MentionEditor, Payload};
pub use suggest::{SourceError, SuggestionSource};
pub use transform::{Origin, Step, StepError, Transaction};
