//! Resource manager capability and its PC/SC implementation

use std::{ffi::CString, fmt, time::Duration};

use parking_lot::Mutex;
use pcsc::{Card, Context, Protocol};
use tracing::trace;

use crate::config::{Disposition, Protocols, Scope, ShareMode};
use crate::state::ReaderState;
use crate::LOG_TARGET;

/// Native resource manager session the controller drives
///
/// Implementations serialize their own native calls. `cancel` must be callable
/// from another thread while `wait_for_change` blocks and must make that wait
/// return. A wait entered after `cancel` must return as well.
pub trait ResourceManager: Send + Sync + 'static {
    /// Card session handle returned by [`ResourceManager::connect`]
    type Card: CardHandle;

    /// Check that the context can still be used
    fn is_valid(&self) -> Result<(), pcsc::Error>;

    /// List the names of the readers currently known
    fn list_readers(&self) -> Result<Vec<String>, pcsc::Error>;

    /// Block until one of `states` differs from its current state, then
    /// write the observed states into each entry's event state
    ///
    /// `None` waits without a timeout.
    fn wait_for_change(
        &self,
        states: &mut [ReaderState],
        timeout: Option<Duration>,
    ) -> Result<(), pcsc::Error>;

    /// Open a session with the card in `reader`
    fn connect(
        &self,
        reader: &str,
        share_mode: ShareMode,
        protocols: Protocols,
    ) -> Result<Self::Card, pcsc::Error>;

    /// Cancel any pending blocking call on this context, and every later wait
    fn cancel(&self) -> Result<(), pcsc::Error>;

    /// Release the context; later calls fail with an invalid handle
    fn release(&self) -> Result<(), pcsc::Error>;
}

/// Open card session
pub trait CardHandle {
    /// Protocol negotiated for the session, if known
    fn protocol(&self) -> Option<Protocol>;

    /// Close the session
    fn disconnect(self, disposition: Disposition) -> Result<(), pcsc::Error>;
}

/// Upper bound of a single native wait when the caller asked for none, so a
/// cancellation that lands before the wait starts is still observed
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// [`ResourceManager`] backed by a PC/SC context
pub struct PcscResourceManager {
    handle: Mutex<Handle>,
}

#[derive(Default)]
struct Handle {
    /// PC/SC context, `None` once released
    context: Option<Context>,
    /// Set by `cancel`, never cleared
    cancelled: bool,
}

impl fmt::Debug for PcscResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handle = self.handle.lock();
        f.debug_struct("PcscResourceManager")
            .field("released", &handle.context.is_none())
            .field("cancelled", &handle.cancelled)
            .finish()
    }
}

impl PcscResourceManager {
    /// Establish a new PC/SC context
    pub fn establish(scope: Scope) -> Result<Self, pcsc::Error> {
        let context = Context::establish(scope.into())?;
        Ok(Self {
            handle: Mutex::new(Handle {
                context: Some(context),
                cancelled: false,
            }),
        })
    }

    /// Handle to the context without holding the lock across native calls
    fn context(&self) -> Result<Context, pcsc::Error> {
        self.handle
            .lock()
            .context
            .clone()
            .ok_or(pcsc::Error::InvalidHandle)
    }

    /// Like [`Self::context`], but fails with `Cancelled` once `cancel` ran
    fn waitable_context(&self) -> Result<Context, pcsc::Error> {
        let handle = self.handle.lock();
        if handle.cancelled {
            return Err(pcsc::Error::Cancelled);
        }
        handle.context.clone().ok_or(pcsc::Error::InvalidHandle)
    }
}

fn reader_name(reader: &str) -> Result<CString, pcsc::Error> {
    CString::new(reader).map_err(|_| pcsc::Error::UnknownReader)
}

impl ResourceManager for PcscResourceManager {
    type Card = PcscCard;

    fn is_valid(&self) -> Result<(), pcsc::Error> {
        self.context()?.is_valid()
    }

    fn list_readers(&self) -> Result<Vec<String>, pcsc::Error> {
        let readers = match self.context()?.list_readers_owned() {
            Ok(readers) => readers,
            // pcsc-lite reports an empty reader list as an error
            Err(pcsc::Error::NoReadersAvailable) => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(readers
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn wait_for_change(
        &self,
        states: &mut [ReaderState],
        timeout: Option<Duration>,
    ) -> Result<(), pcsc::Error> {
        let mut reader_states = states
            .iter()
            .map(|state| {
                Ok(pcsc::ReaderState::new(
                    reader_name(state.reader())?,
                    state.current_state(),
                ))
            })
            .collect::<Result<Vec<_>, pcsc::Error>>()?;

        let limit = timeout.unwrap_or(POLL_INTERVAL);
        loop {
            let context = self.waitable_context()?;
            match context.get_status_change(Some(limit), &mut reader_states) {
                Ok(()) => break,
                Err(pcsc::Error::Timeout) if timeout.is_none() => continue,
                Err(e) => return Err(e),
            }
        }

        for (state, rs) in states.iter_mut().zip(&reader_states) {
            trace!(
                target: LOG_TARGET,
                reader = state.reader(),
                event_state = ?rs.event_state(),
                "status change"
            );
            state.set_event_state(rs.event_state());
        }

        Ok(())
    }

    fn connect(
        &self,
        reader: &str,
        share_mode: ShareMode,
        protocols: Protocols,
    ) -> Result<Self::Card, pcsc::Error> {
        let reader_cstr = reader_name(reader)?;
        let card = self
            .context()?
            .connect(&reader_cstr, share_mode.into(), protocols.into())?;
        Ok(PcscCard { card })
    }

    fn cancel(&self) -> Result<(), pcsc::Error> {
        let context = {
            let mut handle = self.handle.lock();
            handle.cancelled = true;
            handle.context.clone()
        };
        // wakes a wait already blocked in the resource manager
        context.ok_or(pcsc::Error::InvalidHandle)?.cancel()
    }

    fn release(&self) -> Result<(), pcsc::Error> {
        let context = self
            .handle
            .lock()
            .context
            .take()
            .ok_or(pcsc::Error::InvalidHandle)?;

        match context.release() {
            Ok(()) => Ok(()),
            // Another thread still holds a handle; the context is released
            // when the last one is dropped.
            Err((context, pcsc::Error::CantDispose)) => {
                drop(context);
                Ok(())
            }
            Err((_, e)) => Err(e),
        }
    }
}

/// Card session opened through [`PcscResourceManager`]
pub struct PcscCard {
    card: Card,
}

impl fmt::Debug for PcscCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscCard")
            .field("protocol", &self.protocol())
            .finish()
    }
}

impl CardHandle for PcscCard {
    fn protocol(&self) -> Option<Protocol> {
        self.card
            .status2_owned()
            .ok()
            .and_then(|status| status.protocol2())
    }

    fn disconnect(self, disposition: Disposition) -> Result<(), pcsc::Error> {
        self.card
            .disconnect(disposition.into())
            .map_err(|(_, e)| e)
    }
}
