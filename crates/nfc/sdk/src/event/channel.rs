//! Channel-based delivery of card events

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::event::CardEvent;

/// Sender for card events
pub type CardEventSender = Sender<CardEvent>;
/// Receiver for card events
pub type CardEventReceiver = Receiver<CardEvent>;

/// Create an unbounded channel for card events
pub fn card_event_channel() -> (CardEventSender, CardEventReceiver) {
    unbounded()
}

/// Fan-out of card events to every subscriber
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Mutex<Vec<CardEventSender>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self) -> CardEventReceiver {
        let (sender, receiver) = card_event_channel();
        self.senders.lock().push(sender);
        receiver
    }

    /// Deliver to every live subscriber, forgetting the ones that hung up
    pub(crate) fn publish(&self, event: &CardEvent) {
        self.senders
            .lock()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }
}
