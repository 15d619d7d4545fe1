// hum-core/src/lib.rs

//! The core logic for the humming-to-MIDI controller.
//! This crate samples a microphone, finds the dominant pitch of each block,
//! smooths it, quantizes it to a note and fires note-on/note-off events.
//! It is completely headless and contains no GUI code.

pub mod audio;
pub mod config;
pub mod events;
pub mod fft;
pub mod midi;
pub mod pipeline;
pub mod pitch;
pub mod trigger;
pub mod tuning;

/// The display-ready values of one pipeline cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readout {
    /// Smoothed frequency in whole Hz, or 0 when no tone is present.
    pub frequency: u32,
    /// The note the current pitch maps to, or 0 when no tone is present.
    pub note: i32,
    /// Whether the note sink is reachable.
    pub connected: bool,
}

/// Everything the renderer receives for a single cycle.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Magnitude spectrum, `block_size / 2` bins.
    pub magnitudes: Vec<f32>,
    /// Raw (unsmoothed) peak frequency in Hz.
    pub peak_frequency: f32,
    pub readout: Readout,
}
