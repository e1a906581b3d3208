use std::sync::mpsc;

use super::transform::Step;

pub trait SyncProvider: Send {
    /// Publish a locally applied batch
    fn send(&mut self, steps: &[Step]);
    /// Remote batches received since the last poll, oldest first
    fn poll(&mut self) -> Vec<Vec<Step>>;
}

/// In-process provider over a pair of channels. Each end receives what the
/// other sends.
#[derive(Debug)]
pub struct ChannelProvider {
    outgoing: mpsc::Sender<Vec<Step>>,
    incoming: mpsc::Receiver<Vec<Step>>,
}

impl ChannelProvider {
    pub fn pair() -> (ChannelProvider, ChannelProvider) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            ChannelProvider {
                outgoing: a_tx,
                incoming: a_rx,
            },
            ChannelProvider {
                outgoing: b_tx,
                incoming: b_rx,
            },
        )
    }
}

impl SyncProvider for ChannelProvider {
    fn send(&mut self, steps: &[Step]) {
        if self.outgoing.send(steps.to_vec()).is_err() {
            tracing::debug!("collaboration peer disconnected");
        }
    }

    fn poll(&mut self) -> Vec<Vec<Step>> {
        self.incoming.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_delivers_both_ways() {
        let (mut a, mut b) = ChannelProvider::pair();
        a.send(&[Step::insert_text(0, "hi")]);
        b.send(&[Step::delete(0, 1)]);
        assert_eq!(b.poll(), vec![vec![Step::insert_text(0, "hi")]]);
        assert_eq!(a.poll(), vec![vec![Step::delete(0, 1)]]);
        assert!(a.poll().is_empty());
    }

    #[test]
    fn send_after_peer_drop_is_harmless() {
        let (mut a, b) = ChannelProvider::pair();
        drop(b);
        a.send(&[Step::insert_text(0, "x")]);
        assert!(a.poll().is_empty());
    }
}
