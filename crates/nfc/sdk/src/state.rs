//! Per-reader state tracked by the event loop

pub use pcsc::State;

use crate::reader::Reader;

/// State of one monitored reader
///
/// `current_state` is what the caller believes the reader is in, `event_state`
/// is written by the resource manager when it observes something different.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderState {
    reader: String,
    current_state: State,
    event_state: State,
}

impl ReaderState {
    /// Start tracking a reader whose state is not known yet
    pub fn new(reader: impl Into<String>) -> Self {
        Self {
            reader: reader.into(),
            current_state: State::UNAWARE,
            event_state: State::UNAWARE,
        }
    }

    /// Get the reader name
    pub fn reader(&self) -> &str {
        &self.reader
    }

    /// State the next wait compares against
    pub const fn current_state(&self) -> State {
        self.current_state
    }

    /// State last reported by the resource manager
    pub const fn event_state(&self) -> State {
        self.event_state
    }

    /// Record the state reported by the resource manager
    pub const fn set_event_state(&mut self, state: State) {
        self.event_state = state;
    }

    /// Copy the event state into the current state, so the next wait blocks
    /// until the reader changes again
    pub const fn sync_current_state(&mut self) {
        self.current_state = self.event_state;
    }

    /// Check if the last reported state has a card in the reader
    pub fn is_present(&self) -> bool {
        self.event_state.contains(State::PRESENT)
    }
}

/// Build the tracked state list from the enabled readers
pub(crate) fn tracked(readers: &[Reader]) -> Vec<ReaderState> {
    readers
        .iter()
        .filter(|reader| reader.is_enabled())
        .map(|reader| ReaderState::new(reader.name()))
        .collect()
}
