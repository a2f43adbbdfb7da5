//! Event loop watching the selected readers for card presence

use tracing::{debug, error};

use crate::LOG_TARGET;
use crate::card::handle_card;
use crate::config::SdkConfig;
use crate::context::RunContext;
use crate::error::Error;
use crate::event::{CardEvent, Subscribers};
use crate::manager::ResourceManager;
use crate::state::ReaderState;

/// Monitor for card presence across the selected readers
#[derive(Debug)]
pub(crate) struct Monitor<'a, R> {
    pub(crate) manager: &'a R,
    pub(crate) context: &'a RunContext,
    pub(crate) config: &'a SdkConfig,
    pub(crate) subscribers: &'a Subscribers,
}

impl<R> Monitor<'_, R>
where
    R: ResourceManager,
{
    /// Run until the context is cancelled or a fatal error occurs.
    ///
    /// Errors observed after cancellation was requested end the loop
    /// cleanly: cancelling invalidates the context under the blocking wait.
    pub(crate) fn run(&self, states: &mut [ReaderState]) -> Result<(), Error> {
        loop {
            if self.context.is_cancelled() {
                debug!(target: LOG_TARGET, "run context cancelled");
                return Ok(());
            }

            if let Err(e) = self.manager.is_valid() {
                return self.fatal(Error::InvalidContext(e));
            }

            if let Err(e) = self.manager.wait_for_change(states, None) {
                return self.fatal(Error::StatusChange(e));
            }

            for state in states.iter_mut() {
                state.sync_current_state();

                if state.is_present() {
                    debug!(target: LOG_TARGET, reader = state.reader(), "card is present in the reader");
                    // the wait may have been long, check again
                    if let Err(e) = self.manager.is_valid() {
                        return self.fatal(Error::InvalidContext(e));
                    }
                    self.handle(state.reader());
                } else {
                    debug!(target: LOG_TARGET, reader = state.reader(), "no card present, waiting...");
                }
            }
        }
    }

    fn fatal(&self, err: Error) -> Result<(), Error> {
        if self.context.is_cancelled() {
            debug!(target: LOG_TARGET, error = %err, "interrupted by cancellation");
            return Ok(());
        }
        error!(target: LOG_TARGET, error = %err, "event loop stopped");
        Err(err)
    }

    fn handle(&self, reader: &str) {
        let event = match handle_card(self.manager, reader, self.config) {
            Ok(event) => event,
            Err(err) => {
                error!(target: LOG_TARGET, reader, error = %err, "card session failed");
                CardEvent::Failed {
                    reader: reader.to_string(),
                    error: err.to_string(),
                }
            }
        };
        self.subscribers.publish(&event);
    }
}
