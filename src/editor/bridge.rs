use std::sync::mpsc;

/// Where bridge jobs run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// On a fresh worker thread
    #[default]
    Thread,
    /// Synchronously, with the result queued for the next drain. Used by
    /// tests and the CLI where determinism matters more than latency.
    Inline,
}

#[derive(Debug)]
pub struct Bridge<M> {
    sender: mpsc::Sender<M>,
    receiver: mpsc::Receiver<M>,
    dispatch: Dispatch,
}

impl<M: Send + 'static> Bridge<M> {
    pub fn new(dispatch: Dispatch) -> Self {
        let (sender, receiver) = mpsc::channel();
        Bridge {
            sender,
            receiver,
            dispatch,
        }
    }

    /// Run `job` and deliver its result to the next `try_recv_all`
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() -> M + Send + 'static,
    {
        match self.dispatch {
            Dispatch::Inline => {
                // The receiver lives in self, so this cannot fail
                let _ = self.sender.send(job());
            }
            Dispatch::Thread => {
                let sender = self.sender.clone();
                std::thread::spawn(move || {
                    // The editor may be gone by the time the job finishes
                    let _ = sender.send(job());
                });
            }
        }
    }

    /// All results delivered so far, without blocking
    pub fn try_recv_all(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}
