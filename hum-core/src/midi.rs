//! # MIDI Output Module
//!
//! The note sink the trigger fires into, and its MIDI implementation on top
//! of `midir`. Sending is fire-and-forget: while no port is reachable, notes
//! are discarded and the link is retried in the background.

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use midir::{MidiOutput, MidiOutputConnection};

use crate::events::EventSender;

const CLIENT_NAME: &str = "Humminger";
const PORT_NAME: &str = "humminger-out";
const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;

/// Receives note events from the trigger.
pub trait NoteSink {
    fn note_on(&mut self, channel: u8, note: i32, velocity: u8);
    fn note_off(&mut self, channel: u8, note: i32, velocity: u8);

    /// Called once per pipeline cycle for housekeeping such as reconnects.
    fn maintain(&mut self) {}
}

/// Builds a three byte channel voice message, or `None` if `note` is not a
/// valid MIDI note number.
fn note_message(status: u8, channel: u8, note: i32, velocity: u8) -> Option<[u8; 3]> {
    let note = u8::try_from(note).ok().filter(|n| *n <= 127)?;
    Some([status | (channel & 0x0F), note, velocity.min(127)])
}

/// Sends notes to the first MIDI output port matching an optional name hint.
pub struct MidiNoteSink {
    connection: Option<MidiOutputConnection>,
    port_hint: Option<String>,
    events: EventSender,
    last_attempt: Instant,
}

impl MidiNoteSink {
    /// Creates the sink and makes a first connection attempt.
    ///
    /// Connectivity changes are published on `events`.
    pub fn new(port_hint: Option<String>, events: EventSender) -> Self {
        let mut sink = Self {
            connection: None,
            port_hint,
            events,
            last_attempt: Instant::now(),
        };
        sink.reconnect();
        sink
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn reconnect(&mut self) {
        self.last_attempt = Instant::now();
        match self.connect() {
            Ok(connection) => {
                self.connection = Some(connection);
                self.events.connected();
            }
            Err(e) => debug!("MIDI output not available: {}", e),
        }
    }

    fn connect(&self) -> Result<MidiOutputConnection> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI output: {}", e))?;

        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|port| match (&self.port_hint, midi_out.port_name(port)) {
                (Some(hint), Ok(name)) => name.contains(hint.as_str()),
                (None, Ok(_)) => true,
                (_, Err(_)) => false,
            })
            .ok_or_else(|| anyhow!("No matching MIDI output port"))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, PORT_NAME)
            .map_err(|e| anyhow!("Failed to connect to MIDI port '{}': {}", name, e))?;
        info!("Connected to MIDI output '{}'", name);
        Ok(connection)
    }

    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
            info!("MIDI output disconnected");
            self.events.disconnected();
        }
    }

    fn send(&mut self, message: Option<[u8; 3]>) {
        let Some(message) = message else {
            debug!("Dropping note outside the MIDI range");
            return;
        };
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        if let Err(e) = connection.send(&message) {
            warn!("Failed to send MIDI message: {}", e);
            self.disconnect();
        }
    }
}

impl NoteSink for MidiNoteSink {
    fn note_on(&mut self, channel: u8, note: i32, velocity: u8) {
        self.send(note_message(NOTE_ON, channel, note, velocity));
    }

    fn note_off(&mut self, channel: u8, note: i32, velocity: u8) {
        self.send(note_message(NOTE_OFF, channel, note, velocity));
    }

    fn maintain(&mut self) {
        if self.connection.is_none() && self.last_attempt.elapsed() >= RECONNECT_INTERVAL {
            self.reconnect();
        }
    }
}

/// A sink that remembers every call, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub(crate) calls: Vec<(bool, i32)>,
}

#[cfg(test)]
impl NoteSink for RecordingSink {
    fn note_on(&mut self, _channel: u8, note: i32, _velocity: u8) {
        self.calls.push((true, note));
    }

    fn note_off(&mut self, _channel: u8, note: i32, _velocity: u8) {
        self.calls.push((false, note));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_messages() {
        assert_eq!(note_message(NOTE_ON, 0, 60, 100), Some([0x90, 60, 100]));
        assert_eq!(note_message(NOTE_OFF, 3, 53, 100), Some([0x83, 53, 100]));
        assert_eq!(note_message(NOTE_ON, 0x1F, 0, 200), Some([0x9F, 0, 127]));
    }

    #[test]
    fn out_of_range_notes_are_rejected() {
        assert_eq!(note_message(NOTE_ON, 0, -1, 100), None);
        assert_eq!(note_message(NOTE_ON, 0, 128, 100), None);
        assert_eq!(note_message(NOTE_OFF, 0, 1_000, 100), None);
    }
}
