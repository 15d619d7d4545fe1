//! # Note Trigger
//!
//! Monophonic note-on/note-off state machine driven by engage and release
//! edges. Every note-on is matched by exactly one note-off before the next
//! note-on can be emitted.

use log::debug;

use crate::midi::NoteSink;

/// Whether a note is currently sounding on the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Sounding(i32),
}

#[derive(Debug, Clone)]
pub struct NoteTrigger {
    state: TriggerState,
    channel: u8,
    velocity: u8,
}

impl NoteTrigger {
    pub fn new(channel: u8, velocity: u8) -> Self {
        Self {
            state: TriggerState::Idle,
            channel,
            velocity,
        }
    }

    /// Starts `pending_note` if idle and the note is not 0.
    ///
    /// Returns true if a note-on was emitted.
    pub fn engage<K: NoteSink + ?Sized>(&mut self, pending_note: i32, sink: &mut K) -> bool {
        if self.state != TriggerState::Idle || pending_note == 0 {
            return false;
        }
        debug!("note-on {}", pending_note);
        sink.note_on(self.channel, pending_note, self.velocity);
        self.state = TriggerState::Sounding(pending_note);
        true
    }

    /// Stops the sounding note, if any.
    ///
    /// Returns true if a note-off was emitted.
    pub fn release<K: NoteSink + ?Sized>(&mut self, sink: &mut K) -> bool {
        let TriggerState::Sounding(note) = self.state else {
            return false;
        };
        debug!("note-off {}", note);
        sink.note_off(self.channel, note, self.velocity);
        self.state = TriggerState::Idle;
        true
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> TriggerState {
        self.state
    }

    /// The sounding note, or 0 when idle.
    pub fn current_note(&self) -> i32 {
        match self.state {
            TriggerState::Idle => 0,
            TriggerState::Sounding(note) => note,
        }
    }
}
