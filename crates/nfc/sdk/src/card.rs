//! Card session handling

use tracing::debug;

use crate::LOG_TARGET;
use crate::config::SdkConfig;
use crate::error::Error;
use crate::event::CardEvent;
use crate::manager::{CardHandle, ResourceManager};

/// Open a session with the card in `reader` and close it again.
///
/// Failures are per card: the caller logs them and keeps monitoring.
pub(crate) fn handle_card<R>(
    manager: &R,
    reader: &str,
    config: &SdkConfig,
) -> Result<CardEvent, Error>
where
    R: ResourceManager,
{
    let card = manager
        .connect(reader, config.share_mode, config.protocols)
        .map_err(|source| Error::Connect {
            reader: reader.to_string(),
            source,
        })?;

    let protocol = card.protocol();
    debug!(target: LOG_TARGET, reader, ?protocol, "card connected");

    card.disconnect(config.disposition)
        .map_err(|source| Error::Disconnect {
            reader: reader.to_string(),
            source,
        })?;
    debug!(target: LOG_TARGET, reader, "card disconnected");

    Ok(CardEvent::Handled {
        reader: reader.to_string(),
        protocol,
    })
}
