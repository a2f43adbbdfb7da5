//! Lifecycle controller: init, reader selection, event loop and disposal

use std::{
    fmt,
    sync::{Arc, OnceLock},
    thread,
};

use crossbeam_channel::{Receiver, bounded};
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::LOG_TARGET;
use crate::config::{Scope, SdkConfig};
use crate::context::{RunContext, StopHandle};
use crate::error::{BoxError, Error};
use crate::event::{CardEventReceiver, Subscribers};
use crate::manager::{PcscResourceManager, ResourceManager};
use crate::monitor::Monitor;
use crate::reader::{self, Reader};
use crate::selector;
use crate::state;

type SharedSelector = Arc<dyn Fn(Vec<Reader>) -> Result<Vec<Reader>, BoxError> + Send + Sync>;

/// Controller backed by the system PC/SC service
pub type PcscSdk = Sdk<PcscResourceManager>;

/// Reader controller
///
/// Owns the resource manager session and the reader inventory, runs the
/// blocking event loop and guarantees the session is released when the run
/// ends, whichever way it ends.
///
/// A background thread started by [`Sdk::new`] waits for the run context to
/// be cancelled and then disposes the session. [`Sdk::run`] cancels the
/// context when the loop exits and waits for that thread before returning.
pub struct Sdk<R: ResourceManager> {
    inner: Arc<Inner<R>>,
    /// Closed by the disposal thread once it has finished
    disposal_done: Receiver<()>,
}

struct Inner<R> {
    config: SdkConfig,
    context: Arc<RunContext>,
    manager: OnceLock<R>,
    session: RwLock<Session>,
    subscribers: Subscribers,
}

/// Mutable state guarded by one lock
#[derive(Default)]
struct Session {
    disposed: bool,
    readers: Vec<Reader>,
    selector: Option<SharedSelector>,
}

impl<R: ResourceManager> fmt::Debug for Sdk<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.session.read();
        f.debug_struct("Sdk")
            .field("config", &self.inner.config)
            .field("initialized", &self.inner.manager.get().is_some())
            .field("disposed", &session.disposed)
            .field("readers", &session.readers)
            .field("custom_selector", &session.selector.is_some())
            .finish()
    }
}

impl PcscSdk {
    /// Establish the PC/SC context and discover readers
    pub fn init(&self) -> Result<(), Error> {
        self.init_with(PcscResourceManager::establish)
    }
}

impl<R: ResourceManager> Sdk<R> {
    /// Create a controller; no native call is made until [`Sdk::init_with`]
    pub fn new(config: SdkConfig) -> Self {
        let inner = Arc::new(Inner {
            config,
            context: Arc::new(RunContext::new()),
            manager: OnceLock::new(),
            session: RwLock::new(Session::default()),
            subscribers: Subscribers::default(),
        });

        let (done_tx, disposal_done) = bounded::<()>(0);
        let disposer = Arc::clone(&inner);
        thread::spawn(move || {
            disposer.context.wait();
            disposer.dispose();
            drop(done_tx);
        });

        Self {
            inner,
            disposal_done,
        }
    }

    /// Establish the resource manager session with `establish` and discover
    /// readers.
    ///
    /// On failure the error is also recorded as the run's cause: a later
    /// [`Sdk::run`] returns it without entering the loop. Once the controller
    /// was stopped or disposed, the new context is released again and
    /// [`Error::Disposed`] is returned.
    pub fn init_with<F>(&self, establish: F) -> Result<(), Error>
    where
        F: FnOnce(Scope) -> Result<R, pcsc::Error>,
    {
        match self.inner.init(establish) {
            Ok(()) => Ok(()),
            Err(Error::AlreadyInitialized) => {
                warn!(target: LOG_TARGET, "sdk already initialized");
                Err(Error::AlreadyInitialized)
            }
            Err(Error::Disposed) => {
                warn!(target: LOG_TARGET, "sdk already disposed, init ignored");
                Err(Error::Disposed)
            }
            Err(err) => {
                error!(target: LOG_TARGET, error = %err, "initialization failed");
                self.inner.context.cancel(Some(err.clone()));
                Err(err)
            }
        }
    }

    /// Run the event loop, blocking until the run is stopped or fails.
    ///
    /// Returns only after the session has been disposed. `Ok(())` means the
    /// run was stopped without a prior fatal error.
    pub fn run(&self) -> Result<(), Error> {
        let result = if self.inner.context.is_cancelled() {
            debug!(target: LOG_TARGET, "run context already cancelled");
            Ok(())
        } else {
            self.inner.run()
        };

        // every exit goes through the same cleanup path
        self.inner.context.cancel(result.err());
        self.wait_disposal();
        debug!(target: LOG_TARGET, "exiting");

        match self.inner.context.cause() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Register the reader selection callback.
    ///
    /// Only the first registration takes effect; later ones are ignored with
    /// a warning and return `false`. Without a callback the first discovered
    /// reader is used.
    pub fn select_reader<F>(&self, selector: F) -> bool
    where
        F: Fn(Vec<Reader>) -> Result<Vec<Reader>, BoxError> + Send + Sync + 'static,
    {
        let mut session = self.inner.session.write();
        if session.selector.is_some() {
            warn!(target: LOG_TARGET, "reader select callback can only be attached once");
            return false;
        }
        session.selector = Some(Arc::new(selector));
        true
    }

    /// Check if the session has been disposed
    pub fn disposed(&self) -> bool {
        self.inner.session.read().disposed
    }

    /// Stop the run and dispose the session, waiting for disposal to finish.
    ///
    /// Calling this again only logs a warning.
    pub fn dispose(&self) {
        let cancelled = self.inner.context.cancel(None);
        self.wait_disposal();
        if !cancelled {
            self.inner.dispose();
        }
    }

    /// Stop the run without an error
    pub fn stop(&self) {
        self.inner.context.cancel(None);
    }

    /// Stop the run with an error that [`Sdk::run`] returns
    pub fn stop_with(&self, err: Error) {
        self.inner.context.cancel(Some(err));
    }

    /// Handle for stopping the run from another thread
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.inner.context))
    }

    /// Snapshot of the reader inventory
    pub fn readers(&self) -> Vec<Reader> {
        self.inner.session.read().readers.clone()
    }

    /// Subscribe to the outcome of every handled card
    pub fn subscribe(&self) -> CardEventReceiver {
        self.inner.subscribers.subscribe()
    }

    /// Configuration in use
    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    fn wait_disposal(&self) {
        // never sent on, returns once the disposal thread is done
        let _ = self.disposal_done.recv();
    }
}

impl<R: ResourceManager> Drop for Sdk<R> {
    fn drop(&mut self) {
        self.inner.context.cancel(None);
        self.wait_disposal();
    }
}

impl<R: ResourceManager> Inner<R> {
    fn init<F>(&self, establish: F) -> Result<(), Error>
    where
        F: FnOnce(Scope) -> Result<R, pcsc::Error>,
    {
        if self.manager.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let manager = establish(self.config.scope).map_err(Error::Establish)?;
        // Checked and stored under the lock disposal takes: the context is
        // either rejected here or released by disposal. Stored before listing
        // so that disposal releases it on failure.
        let rejected = {
            let session = self.session.write();
            if session.disposed || self.context.is_cancelled() {
                Some((manager, Error::Disposed))
            } else {
                self.manager
                    .set(manager)
                    .err()
                    .map(|manager| (manager, Error::AlreadyInitialized))
            }
        };
        if let Some((manager, err)) = rejected {
            if let Err(e) = manager.release() {
                let release = Error::Release(e);
                warn!(target: LOG_TARGET, error = %release, "rejected context");
            }
            return Err(err);
        }
        debug!(target: LOG_TARGET, "scard context established");

        let manager = self.manager.get().ok_or(Error::NotInitialized)?;
        let names = manager.list_readers().map_err(Error::ListReaders)?;
        if names.is_empty() {
            return Err(Error::NoReadersFound);
        }

        let readers = reader::inventory(names);
        for found in &readers {
            debug!(
                target: LOG_TARGET,
                { reader.id = found.id(), reader.name = found.name() },
                "found"
            );
        }
        self.session.write().readers = readers;

        Ok(())
    }

    fn run(&self) -> Result<(), Error> {
        let manager = self.preflight()?;

        self.select()?;

        let mut states = state::tracked(&self.session.read().readers);
        if states.is_empty() {
            error!(target: LOG_TARGET, "no readers enabled");
            return Err(Error::NoReadersEnabled);
        }

        Monitor {
            manager,
            context: &self.context,
            config: &self.config,
            subscribers: &self.subscribers,
        }
        .run(&mut states)
    }

    /// Refuse to start against an invalid context or an empty inventory
    fn preflight(&self) -> Result<&R, Error> {
        let session = self.session.read();

        let mut err = match self.manager.get() {
            None => Some(Error::NotInitialized),
            Some(manager) => manager.is_valid().err().map(Error::InvalidContext),
        };
        if session.readers.is_empty() {
            err = Error::join(err, Some(Error::NoReadersPresent));
        }

        match (err, self.manager.get()) {
            (None, Some(manager)) => Ok(manager),
            (err, _) => {
                let err = err.unwrap_or(Error::NotInitialized);
                error!(target: LOG_TARGET, error = %err, "refusing to start");
                Err(err)
            }
        }
    }

    /// Apply the registered selector, or the default policy
    fn select(&self) -> Result<(), Error> {
        let selector = self.session.read().selector.clone();

        match selector {
            Some(selector) => {
                let readers = self.session.read().readers.clone();
                // called without the lock held, the callback may use the sdk
                let readers = selector(readers).map_err(|err| {
                    let err = Error::selection(err);
                    error!(target: LOG_TARGET, error = %err, "reader selection failed");
                    err
                })?;
                self.session.write().readers = readers;
            }
            None => selector::apply_default(&mut self.session.write().readers),
        }

        for used in self.session.read().readers.iter().filter(|r| r.is_enabled()) {
            debug!(
                target: LOG_TARGET,
                { reader.id = used.id(), reader.name = used.name() },
                "using reader"
            );
        }
        Ok(())
    }

    /// Tear the session down once; later calls only warn
    fn dispose(&self) {
        let mut session = self.session.write();
        if session.disposed {
            warn!(target: LOG_TARGET, "sdk already disposed");
            return;
        }
        session.disposed = true;
        debug!(target: LOG_TARGET, "disposing...");

        if let Some(manager) = self.manager.get() {
            debug!(target: LOG_TARGET, "cancel pending actions");
            if let Err(e) = manager.cancel() {
                let err = Error::Cancel(e);
                error!(target: LOG_TARGET, error = %err, "dispose");
            }

            debug!(target: LOG_TARGET, "release scard context");
            if let Err(e) = manager.release() {
                let err = Error::Release(e);
                error!(target: LOG_TARGET, error = %err, "dispose");
            }
        }

        debug!(target: LOG_TARGET, "sdk disposed");
    }
}
