//! # Control Events
//!
//! Edge events coming from outside the pipeline (the hum pad and the MIDI
//! link) travel through a bounded queue that the pipeline drains once per
//! cycle. Producers never block; a full queue drops the newest event.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::warn;

/// One edge produced by an input or by the note sink's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// A press gesture began.
    Engage,
    /// The press gesture ended.
    Release,
    /// The note sink became reachable.
    Connected,
    /// The note sink became unreachable.
    Disconnected,
}

/// Producer half of the control queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<ControlEvent>,
}

/// Consumer half of the control queue, owned by the pipeline.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: Receiver<ControlEvent>,
}

/// Creates a control queue holding at most `capacity` pending events.
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    (EventSender { sender }, EventReceiver { receiver })
}

impl EventSender {
    /// Queues `event` without blocking. Returns false if it was dropped.
    pub fn send(&self, event: ControlEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("Control queue full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn engage(&self) -> bool {
        self.send(ControlEvent::Engage)
    }

    pub fn release(&self) -> bool {
        self.send(ControlEvent::Release)
    }

    pub fn connected(&self) -> bool {
        self.send(ControlEvent::Connected)
    }

    pub fn disconnected(&self) -> bool {
        self.send(ControlEvent::Disconnected)
    }
}

impl EventReceiver {
    /// Takes every event queued so far, oldest first.
    pub fn drain(&self) -> impl Iterator<Item = ControlEvent> + '_ {
        self.receiver.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_order() {
        let (sender, receiver) = event_queue(8);
        assert!(sender.engage());
        assert!(sender.connected());
        assert!(sender.release());
        let events: Vec<_> = receiver.drain().collect();
        assert_eq!(
            events,
            vec![
                ControlEvent::Engage,
                ControlEvent::Connected,
                ControlEvent::Release
            ]
        );
        assert_eq!(receiver.drain().count(), 0);
    }

    #[test]
    fn full_queue_drops_newest() {
        let (sender, receiver) = event_queue(2);
        assert!(sender.engage());
        assert!(sender.release());
        assert!(!sender.engage());
        let events: Vec<_> = receiver.drain().collect();
        assert_eq!(events, vec![ControlEvent::Engage, ControlEvent::Release]);
    }

    #[test]
    fn send_after_receiver_dropped_is_harmless() {
        let (sender, receiver) = event_queue(2);
        drop(receiver);
        assert!(!sender.disconnected());
    }
}
