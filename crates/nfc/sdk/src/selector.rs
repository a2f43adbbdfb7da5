//! Reader selection policies
//!
//! A selector receives the whole inventory and returns the readers to keep,
//! with [`Reader::is_enabled`] set on the ones the event loop should watch.
//! The returned list replaces the inventory.

use crate::error::BoxError;
use crate::reader::Reader;

/// Custom reader selection callback
pub type ReaderSelector =
    Box<dyn Fn(Vec<Reader>) -> Result<Vec<Reader>, BoxError> + Send + Sync + 'static>;

/// Policy applied when no selector is registered: enable the first reader
pub(crate) fn apply_default(readers: &mut [Reader]) {
    if let Some(first) = readers.first_mut() {
        first.enable();
    }
}

/// Enable only the first discovered reader
pub fn first() -> ReaderSelector {
    Box::new(|mut readers| {
        apply_default(&mut readers);
        Ok(readers)
    })
}

/// Enable every discovered reader
pub fn all() -> ReaderSelector {
    Box::new(|readers| Ok(readers.into_iter().map(Reader::enabled).collect()))
}

/// Enable the readers whose name contains `pattern`, ignoring case
///
/// Fails when no reader matches.
pub fn by_name(pattern: impl Into<String>) -> ReaderSelector {
    let pattern = pattern.into().to_lowercase();
    Box::new(move |readers| {
        let readers: Vec<Reader> = readers
            .into_iter()
            .map(|reader| {
                if reader.name().to_lowercase().contains(&pattern) {
                    reader.enabled()
                } else {
                    reader
                }
            })
            .collect();

        if !readers.iter().any(Reader::is_enabled) {
            return Err(format!("no reader matching {pattern:?}").into());
        }
        Ok(readers)
    })
}
