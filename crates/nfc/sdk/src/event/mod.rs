//! Card events published by the event loop

pub mod channel;
pub use channel::*;

use pcsc::Protocol;

/// Outcome of handling a card found in a monitored reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    /// A session was opened and closed again
    Handled {
        /// Reader name
        reader: String,
        /// Negotiated protocol, if the resource manager reported one
        protocol: Option<Protocol>,
    },
    /// Opening or closing the session failed
    Failed {
        /// Reader name
        reader: String,
        /// Rendered error
        error: String,
    },
}

impl CardEvent {
    /// Name of the reader the event belongs to
    pub fn reader(&self) -> &str {
        match self {
            Self::Handled { reader, .. } | Self::Failed { reader, .. } => reader,
        }
    }
}
