//! Cancellation signal shared by the controller, its disposal thread and the
//! embedding application

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

use crate::error::Error;

/// Cancellable run context carrying the error that caused cancellation
///
/// Cancelling drops the only sender, which wakes every receiver at once.
#[derive(Debug)]
pub(crate) struct RunContext {
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    cause: Mutex<Option<Error>>,
}

impl RunContext {
    pub(crate) fn new() -> Self {
        let (done_tx, done_rx) = bounded(0);
        Self {
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
            cause: Mutex::new(None),
        }
    }

    /// Cancel the context. Only the first call records its cause; returns
    /// whether this call was the one that cancelled.
    pub(crate) fn cancel(&self, cause: Option<Error>) -> bool {
        let mut done_tx = self.done_tx.lock();
        let Some(tx) = done_tx.take() else {
            return false;
        };
        *self.cause.lock() = cause;
        drop(tx);
        true
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.done_tx.lock().is_none()
    }

    /// Block until the context is cancelled
    pub(crate) fn wait(&self) {
        // never sent on, returns once the sender is dropped
        let _ = self.done_rx.recv();
    }

    /// Error the context was cancelled with, if any
    pub(crate) fn cause(&self) -> Option<Error> {
        self.cause.lock().clone()
    }
}

/// Handle used to stop a running controller from another thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    context: Arc<RunContext>,
}

impl StopHandle {
    pub(crate) const fn new(context: Arc<RunContext>) -> Self {
        Self { context }
    }

    /// Stop without an error; `run` returns `Ok(())` unless it already failed
    pub fn stop(&self) {
        self.context.cancel(None);
    }

    /// Stop with an error that `run` returns
    pub fn stop_with(&self, err: Error) {
        self.context.cancel(Some(err));
    }

    /// Check if a stop was already requested
    pub fn is_stopped(&self) -> bool {
        self.context.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_first_cause_wins() {
        let context = RunContext::new();
        assert!(!context.is_cancelled());

        assert!(context.cancel(Some(Error::NoReadersEnabled)));
        assert!(!context.cancel(Some(Error::NoReadersPresent)));
        assert!(context.is_cancelled());

        assert!(matches!(context.cause(), Some(Error::NoReadersEnabled)));
    }

    #[test]
    fn test_wait_wakes_on_stop() {
        let context = Arc::new(RunContext::new());
        let handle = StopHandle::new(Arc::clone(&context));

        let waiter = {
            let context = Arc::clone(&context);
            thread::spawn(move || context.wait())
        };

        thread::sleep(Duration::from_millis(20));
        handle.stop();
        waiter.join().unwrap();

        assert!(handle.is_stopped());
        assert!(context.cause().is_none());
    }
}
