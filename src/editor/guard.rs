use std::time::{Duration, Instant};

/// How a held guard flag was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The scheduled turn arrived
    Scheduled,
    /// The wall-clock deadline passed first
    TimedOut,
}

/// A boolean that suppresses one category of reentrant processing.
///
/// A flag is never cleared in the call that sets it: release happens on a
/// later scheduler turn, or at the deadline if turns stop arriving.
#[derive(Debug, Clone, Default)]
pub struct GuardFlag {
    active: bool,
    release_turn: u64,
    deadline: Option<Instant>,
}

impl GuardFlag {
    pub fn is_set(&self) -> bool {
        self.active
    }

    /// Set the flag until `release_turn` or `deadline`, whichever comes first.
    /// Holding an already-set flag extends both.
    pub fn hold(&mut self, release_turn: u64, deadline: Instant) {
        if self.active {
            self.release_turn = self.release_turn.max(release_turn);
            self.deadline = Some(self.deadline.map_or(deadline, |d| d.max(deadline)));
        } else {
            self.active = true;
            self.release_turn = release_turn;
            self.deadline = Some(deadline);
        }
    }

    /// Release the flag if its turn or deadline has come
    pub fn poll(&mut self, turn: u64, now: Instant) -> Option<Release> {
        if !self.active {
            return None;
        }
        let release = if turn >= self.release_turn {
            Release::Scheduled
        } else if self.deadline.is_some_and(|d| now >= d) {
            Release::TimedOut
        } else {
            return None;
        };
        self.active = false;
        self.deadline = None;
        Some(release)
    }
}

/// The per-editor guard pair
#[derive(Debug, Clone)]
pub struct Guards {
    inserting_mention: GuardFlag,
    external_update: GuardFlag,
    release_turns: u64,
    timeout: Duration,
}

impl Guards {
    pub fn new(release_turns: u64, timeout: Duration) -> Self {
        Guards {
            inserting_mention: GuardFlag::default(),
            external_update: GuardFlag::default(),
            release_turns: release_turns.max(1),
            timeout,
        }
    }

    /// Suppresses trigger scanning
    pub fn is_inserting_mention(&self) -> bool {
        self.inserting_mention.is_set()
    }

    /// Suppresses change notifications to the host
    pub fn is_external_update(&self) -> bool {
        self.external_update.is_set()
    }

    /// Hold both flags around a mention insertion
    pub fn hold_for_mention(&mut self, turn: u64, now: Instant) {
        let (release_turn, deadline) = self.window(turn, now);
        self.inserting_mention.hold(release_turn, deadline);
        self.external_update.hold(release_turn, deadline);
    }

    /// Hold the external-update flag around a programmatic content change
    pub fn hold_external(&mut self, turn: u64, now: Instant) {
        let (release_turn, deadline) = self.window(turn, now);
        self.external_update.hold(release_turn, deadline);
    }

    fn window(&self, turn: u64, now: Instant) -> (u64, Instant) {
        (turn + self.release_turns, now + self.timeout)
    }

    /// Release whichever flags are due
    pub fn poll(&mut self, turn: u64, now: Instant) {
        if let Some(release) = self.inserting_mention.poll(turn, now) {
            log_release("inserting_mention", release);
        }
        if let Some(release) = self.external_update.poll(turn, now) {
            log_release("external_update", release);
        }
    }
}

fn log_release(flag: &str, release: Release) {
    match release {
        Release::Scheduled => tracing::trace!(flag, "guard released"),
        Release::TimedOut => tracing::warn!(flag, "guard released by timeout"),
    }
}
