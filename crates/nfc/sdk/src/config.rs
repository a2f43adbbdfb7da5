//! Configuration options for the reader controller

use pcsc::{
    Disposition as PcscDisposition, Protocols as PcscProtocols, Scope as PcscScope,
    ShareMode as PcscShareMode,
};

/// Scope of the resource manager context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Scope {
    /// Operations are performed within the domain of the user
    User,
    /// Operations are performed within the domain of the system (default)
    #[default]
    System,
}

impl From<Scope> for PcscScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::User => Self::User,
            Scope::System => Self::System,
        }
    }
}

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShareMode {
    /// Exclusive access to the card (default)
    #[default]
    Exclusive,
    /// Shared access to the card
    Shared,
    /// Direct connection to the reader
    Direct,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Protocols the card may negotiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Protocols {
    /// T=0 only
    T0,
    /// T=1 only
    T1,
    /// Raw protocol
    Raw,
    /// Any protocol, negotiated by the resource manager (default)
    #[default]
    Any,
}

impl From<Protocols> for PcscProtocols {
    fn from(protocols: Protocols) -> Self {
        match protocols {
            Protocols::T0 => Self::T0,
            Protocols::T1 => Self::T1,
            Protocols::Raw => Self::RAW,
            Protocols::Any => Self::ANY,
        }
    }
}

/// What to do with the card when the session is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Disposition {
    /// Leave the card as is
    Leave,
    /// Reset the card (default)
    #[default]
    Reset,
    /// Power the card down
    Unpower,
    /// Eject the card, if the reader supports it
    Eject,
}

impl From<Disposition> for PcscDisposition {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Leave => Self::LeaveCard,
            Disposition::Reset => Self::ResetCard,
            Disposition::Unpower => Self::UnpowerCard,
            Disposition::Eject => Self::EjectCard,
        }
    }
}

/// Configuration options for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SdkConfig {
    /// Scope of the resource manager context
    pub scope: Scope,

    /// Sharing mode for card sessions
    pub share_mode: ShareMode,

    /// Protocols offered when opening a card session
    pub protocols: Protocols,

    /// Disposition applied when closing a card session
    pub disposition: Disposition,
}

impl SdkConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context scope
    pub const fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the preferred protocols
    pub const fn with_protocols(mut self, protocols: Protocols) -> Self {
        self.protocols = protocols;
        self
    }

    /// Set the disposition used on disconnect
    pub const fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }
}
