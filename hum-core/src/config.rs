//! # Pipeline Configuration
//!
//! Build-time constants for the humming pipeline. None of these are read from
//! files or the environment; `PipelineConfig` only groups them so that every
//! stage receives its parameters explicitly.

use std::time::Duration;

/// Rate at which the microphone is sampled, in Hz.
pub const SAMPLE_RATE: u32 = 40_000;

/// Number of samples per analysis block. Must be a power of two.
pub const BLOCK_SIZE: usize = 256;

/// Bottom of the reference frequency band (Hz).
pub const RHZ_B: f32 = 520.0;
/// Top of the reference frequency band (Hz).
pub const RHZ_T: f32 = 1350.0;
/// Additive offset folded into the half-step bias (Hz).
pub const RHZ_D: f32 = 45.0;

/// Note index the bottom of the reference band maps to.
pub const NOT_B: i32 = 53;
/// Note index the top of the reference band maps to.
pub const NOT_T: i32 = 68;

/// Weight of the previous value in the single-pole smoothing filter.
pub const SMOOTHING_FACTOR: f32 = 0.9;

/// Peak frequencies at or above this are treated as "no plausible tone".
pub const SILENCE_CEILING_HZ: f32 = 3000.0;

/// Pause between two pipeline cycles.
pub const CYCLE_DELAY: Duration = Duration::from_millis(10);

/// MIDI channel used for note events.
pub const MIDI_CHANNEL: u8 = 0;
/// Velocity sent with both note-on and note-off.
pub const NOTE_VELOCITY: u8 = 100;

/// Capacity of the control event queue between inputs and the pipeline.
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// All parameters of one pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub band: NoteBand,
    pub smoothing_factor: f32,
    pub silence_ceiling_hz: f32,
    pub cycle_delay: Duration,
    pub midi_channel: u8,
    pub velocity: u8,
}

/// The affine frequency-to-note mapping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteBand {
    /// Reference band bottom and top, in Hz.
    pub freq_bottom: f32,
    pub freq_top: f32,
    /// Extra offset added to the half-step bias, in Hz.
    pub freq_offset: f32,
    /// Note indices the band endpoints map to.
    pub note_bottom: i32,
    pub note_top: i32,
}

impl Default for NoteBand {
    fn default() -> Self {
        Self {
            freq_bottom: RHZ_B,
            freq_top: RHZ_T,
            freq_offset: RHZ_D,
            note_bottom: NOT_B,
            note_top: NOT_T,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            block_size: BLOCK_SIZE,
            band: NoteBand::default(),
            smoothing_factor: SMOOTHING_FACTOR,
            silence_ceiling_hz: SILENCE_CEILING_HZ,
            cycle_delay: CYCLE_DELAY,
            midi_channel: MIDI_CHANNEL,
            velocity: NOTE_VELOCITY,
        }
    }
}

impl PipelineConfig {
    /// Width of one spectrum bin in Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.block_size as f32
    }

    /// Wall-clock duration of one sample block.
    pub fn block_duration(&self) -> Duration {
        let rate = u64::from(self.sample_rate.max(1));
        Duration::from_nanos(self.block_size as u64 * 1_000_000_000 / rate)
    }
}
