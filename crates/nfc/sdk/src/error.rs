//! Error types for the reader controller

use std::{fmt, sync::Arc};

/// Boxed error returned by custom reader selectors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared error returned by custom reader selectors
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors produced by the reader controller
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Establishing the resource manager context failed
    #[error("failed to establish resource manager context: {0}")]
    Establish(#[source] pcsc::Error),

    /// Listing readers failed
    #[error("failed to list readers: {0}")]
    ListReaders(#[source] pcsc::Error),

    /// The resource manager returned no readers
    #[error("no readers returned by resource manager")]
    NoReadersFound,

    /// The reader inventory is empty when the run starts
    #[error("no readers present")]
    NoReadersPresent,

    /// `run` was called before a successful `init`
    #[error("resource manager context not initialized")]
    NotInitialized,

    /// `init` was called more than once
    #[error("resource manager context already initialized")]
    AlreadyInitialized,

    /// `init` was called after the controller was stopped or disposed
    #[error("sdk already disposed")]
    Disposed,

    /// Custom reader selector failed
    #[error("reader selection failed: {0}")]
    Selection(#[source] SharedError),

    /// Selection left no reader enabled
    #[error("no readers enabled")]
    NoReadersEnabled,

    /// The resource manager context is no longer valid
    #[error("resource manager context is not valid: {0}")]
    InvalidContext(#[source] pcsc::Error),

    /// Waiting for a reader status change failed
    #[error("waiting for reader status change failed: {0}")]
    StatusChange(#[source] pcsc::Error),

    /// Connecting to the card failed
    #[error("failed to connect to card in {reader}: {source}")]
    Connect {
        /// Reader name
        reader: String,
        /// Native error
        #[source]
        source: pcsc::Error,
    },

    /// Disconnecting from the card failed
    #[error("failed to disconnect card in {reader}: {source}")]
    Disconnect {
        /// Reader name
        reader: String,
        /// Native error
        #[source]
        source: pcsc::Error,
    },

    /// Cancelling pending resource manager calls failed
    #[error("failed to cancel pending actions: {0}")]
    Cancel(#[source] pcsc::Error),

    /// Releasing the resource manager context failed
    #[error("failed to release resource manager context: {0}")]
    Release(#[source] pcsc::Error),

    /// Several errors reported together
    #[error("{}", DisplayJoined(.0))]
    Multiple(Vec<Error>),
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Resource manager unreachable or no readers
    Initialization,
    /// Custom selector failed
    Selection,
    /// Nothing to monitor after selection
    Configuration,
    /// The event loop had to stop
    Loop,
    /// A single card could not be handled
    Card,
    /// Teardown step failed
    Disposal,
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Establish(_)
            | Self::ListReaders(_)
            | Self::NoReadersFound
            | Self::NoReadersPresent
            | Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::Disposed => ErrorKind::Initialization,
            Self::Selection(_) => ErrorKind::Selection,
            Self::NoReadersEnabled => ErrorKind::Configuration,
            Self::InvalidContext(_) | Self::StatusChange(_) => ErrorKind::Loop,
            Self::Connect { .. } | Self::Disconnect { .. } => ErrorKind::Card,
            Self::Cancel(_) | Self::Release(_) => ErrorKind::Disposal,
            Self::Multiple(errors) => errors
                .first()
                .map_or(ErrorKind::Initialization, Self::kind),
        }
    }

    /// Wrap a custom selector error
    pub fn selection<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        let err: BoxError = err.into();
        Self::Selection(Arc::from(err))
    }

    /// Join two optional errors, flattening nested [`Error::Multiple`]
    pub fn join(first: Option<Self>, second: Option<Self>) -> Option<Self> {
        match (first, second) {
            (None, None) => None,
            (Some(err), None) | (None, Some(err)) => Some(err),
            (Some(a), Some(b)) => {
                let mut errors = a.into_vec();
                errors.extend(b.into_vec());
                Some(Self::Multiple(errors))
            }
        }
    }

    /// Errors contained in this one; a single error yields itself
    pub fn errors(&self) -> &[Self] {
        match self {
            Self::Multiple(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }

    fn into_vec(self) -> Vec<Self> {
        match self {
            Self::Multiple(errors) => errors,
            other => vec![other],
        }
    }
}

struct DisplayJoined<'a>(&'a [Error]);

impl fmt::Display for DisplayJoined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_flattens() {
        let joined = Error::join(
            Some(Error::InvalidContext(pcsc::Error::InvalidHandle)),
            Some(Error::NoReadersPresent),
        )
        .unwrap();
        let joined = Error::join(Some(joined), Some(Error::NoReadersEnabled)).unwrap();

        assert_eq!(joined.errors().len(), 3);
        assert_eq!(joined.kind(), ErrorKind::Loop);
        assert_eq!(
            joined.to_string().lines().nth(1),
            Some("no readers present")
        );
    }

    #[test]
    fn test_join_single() {
        assert!(Error::join(None, None).is_none());
        let err = Error::join(None, Some(Error::NoReadersFound)).unwrap();
        assert!(matches!(err, Error::NoReadersFound));
        assert_eq!(err.errors().len(), 1);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::NoReadersFound.kind(), ErrorKind::Initialization);
        assert_eq!(Error::selection("nope").kind(), ErrorKind::Selection);
        assert_eq!(Error::NoReadersEnabled.kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::Connect {
                reader: "R0".into(),
                source: pcsc::Error::NoSmartcard,
            }
            .kind(),
            ErrorKind::Card
        );
        assert_eq!(
            Error::Release(pcsc::Error::InvalidHandle).kind(),
            ErrorKind::Disposal
        );
    }
}
