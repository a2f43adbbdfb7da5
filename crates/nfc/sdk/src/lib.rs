//! Host-side controller for PC/SC contactless card readers
//!
//! This crate discovers readers through the PC/SC resource manager, selects
//! the ones to monitor, and runs a blocking event loop that opens and closes
//! a session with every card presented to them. The resource manager context
//! is always released when the run ends, whether it was stopped, failed, or
//! the context was invalidated underneath it.
//!
//! # Examples
//!
//! ```no_run
//! use std::thread;
//!
//! use nfc_sdk::{PcscSdk, SdkConfig, selector};
//!
//! # fn main() -> Result<(), nfc_sdk::Error> {
//! let sdk = PcscSdk::new(SdkConfig::default());
//! sdk.init()?;
//! sdk.select_reader(selector::all());
//!
//! let stop = sdk.stop_handle();
//! thread::spawn(move || {
//!     // stop from elsewhere, e.g. a signal handler
//!     stop.stop();
//! });
//!
//! // blocks until stopped; the context is released before it returns
//! sdk.run()?;
//! assert!(sdk.disposed());
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Events are emitted through [`tracing`] with the target [`LOG_TARGET`]. The
//! crate never installs a subscriber; without one, logging is a no-op.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod card;
mod config;
mod context;
mod error;
pub mod event;
mod manager;
mod monitor;
mod reader;
mod sdk;
pub mod selector;
mod state;

/// Target of every log event emitted by this crate
pub const LOG_TARGET: &str = "nfc";

pub use config::{Disposition, Protocols, Scope, SdkConfig, ShareMode};
pub use context::StopHandle;
pub use error::{BoxError, Error, ErrorKind, Result, SharedError};
pub use event::{CardEvent, CardEventReceiver, CardEventSender};
pub use manager::{CardHandle, PcscCard, PcscResourceManager, ResourceManager};
pub use reader::Reader;
pub use sdk::{PcscSdk, Sdk};
pub use selector::ReaderSelector;
pub use state::{ReaderState, State};

// Re-export some pcsc types for convenience
pub use pcsc::Protocol;
