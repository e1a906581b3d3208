use std::collections::VecDeque;

/// Cooperative turn-based scheduler.
///
/// Work deferred during turn `n` runs no earlier than turn `n + 1`, so a
/// deferred task always observes every synchronous effect of the call that
/// scheduled it.
#[derive(Debug)]
pub struct Scheduler<T> {
    turn: u64,
    queue: VecDeque<(u64, T)>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Scheduler {
            turn: 0,
            queue: VecDeque::new(),
        }
    }

    /// The current turn number
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Run `task` on the next turn
    pub fn defer(&mut self, task: T) {
        self.defer_by(1, task);
    }

    /// Run `task` after `turns` turns (at least one)
    pub fn defer_by(&mut self, turns: u64, task: T) {
        let due = self.turn + turns.max(1);
        self.queue.push_back((due, task));
    }

    /// Drop queued tasks matching the predicate
    pub fn cancel(&mut self, mut pred: impl FnMut(&T) -> bool) {
        self.queue.retain(|(_, task)| !pred(task));
    }

    /// Whether any queued task matches the predicate
    pub fn has_pending(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        self.queue.iter().any(|(_, task)| pred(task))
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Start the next turn and return the tasks due on it, in scheduling order.
    pub fn advance(&mut self) -> Vec<T> {
        self.turn += 1;
        let turn = self.turn;
        let mut due = Vec::new();
        let mut later = VecDeque::with_capacity(self.queue.len());
        for (at, task) in self.queue.drain(..) {
            if at <= turn {
                due.push(task);
            } else {
                later.push_back((at, task));
            }
        }
        self.queue = later;
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_work_waits_one_turn() {
        let mut s = Scheduler::new();
        s.defer("scan");
        assert!(!s.is_idle());
        assert_eq!(s.advance(), vec!["scan"]);
        assert!(s.advance().is_empty());
        assert!(s.is_idle());
    }

    #[test]
    fn work_scheduled_during_a_turn_runs_next_turn() {
        let mut s = Scheduler::new();
        s.defer(1);
        let due = s.advance();
        assert_eq!(due, vec![1]);
        s.defer(2);
        assert_eq!(s.advance(), vec![2]);
    }

    #[test]
    fn defer_by_counts_turns() {
        let mut s = Scheduler::new();
        s.defer_by(3, 'x');
        s.defer_by(0, 'y');
        assert_eq!(s.advance(), vec!['y']);
        assert!(s.advance().is_empty());
        assert_eq!(s.advance(), vec!['x']);
        assert_eq!(s.turn(), 3);
    }

    #[test]
    fn cancel_drops_matching_tasks() {
        let mut s = Scheduler::new();
        s.defer(1);
        s.defer(2);
        s.cancel(|t| *t == 1);
        assert!(s.has_pending(|t| *t == 2));
        assert!(!s.has_pending(|t| *t == 1));
        assert_eq!(s.advance(), vec![2]);
    }
}
