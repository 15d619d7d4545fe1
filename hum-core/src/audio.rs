//! # Audio Capture Module
//!
//! This module turns a microphone into a paced stream of normalized samples.
//! It provides the `SampleSource` abstraction the pipeline reads from, the
//! busy-wait `Sampler` that captures one analysis block at a fixed rate, and a
//! CPAL (Cross-Platform Audio Library) backed source for live input.
//!
//! ## Features
//! - Fixed-rate block capture with busy-wait pacing
//! - Automatic audio device selection
//! - Rate conversion from the device clock to the analysis rate
//! - Sample-and-hold when the device falls behind

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info};

/// Longest time a live source waits for the device before repeating its last
/// sample.
const DEVICE_STALL_TIMEOUT: Duration = Duration::from_millis(100);

/// Anything that can hand out one normalized sample on demand.
pub trait SampleSource {
    /// Returns the current sample, scaled into [-1.0, 1.0].
    fn read_sample(&mut self) -> f32;

    /// Called once before every block. Sources with an internal backlog can
    /// use it to discard stale data.
    fn begin_block(&mut self) {}
}

/// Captures fixed-size sample blocks at a fixed rate.
///
/// Each sample is taken one sample period after the start of the previous
/// capture. Pacing is a busy-wait: if reading a sample takes longer than the
/// period, the block simply takes longer. Nothing is dropped or corrected.
pub struct Sampler<S> {
    source: S,
    period: Duration,
}

impl<S: SampleSource> Sampler<S> {
    pub fn new(source: S, sample_rate: u32) -> Self {
        let rate = u64::from(sample_rate.max(1));
        Self {
            source,
            period: Duration::from_nanos((1_000_000_000 + rate / 2) / rate),
        }
    }

    /// Fills `block` with consecutive samples, blocking for the whole
    /// block duration.
    pub fn fill(&mut self, block: &mut [f32]) {
        self.source.begin_block();
        for slot in block.iter_mut() {
            let started = Instant::now();
            *slot = self.source.read_sample();
            while started.elapsed() < self.period {
                std::hint::spin_loop();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn period(&self) -> Duration {
        self.period
    }
}

/// A live microphone source fed by a CPAL input stream.
///
/// The stream callback pushes the first channel of every frame into a bounded
/// queue. Reads step through that queue at `device_rate / sample_rate` samples
/// per call, so the pipeline sees the device signal at the analysis rate.
pub struct CpalSource {
    receiver: Receiver<f32>,
    step: f64,
    phase: f64,
    held: f32,
    /// Set after a timeout; the rest of the block reads without waiting.
    stalled: bool,
}

impl CpalSource {
    fn new(receiver: Receiver<f32>, device_rate: u32, sample_rate: u32) -> Self {
        Self {
            receiver,
            step: f64::from(device_rate) / f64::from(sample_rate.max(1)),
            phase: 0.0,
            held: 0.0,
            stalled: false,
        }
    }
}

impl SampleSource for CpalSource {
    fn read_sample(&mut self) -> f32 {
        self.phase += self.step;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            let received = if self.stalled {
                self.receiver.try_recv().ok()
            } else {
                match self.receiver.recv_timeout(DEVICE_STALL_TIMEOUT) {
                    Ok(sample) => Some(sample),
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("Audio device stalled, holding last sample");
                        self.stalled = true;
                        None
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        self.stalled = true;
                        None
                    }
                }
            };
            match received {
                Some(sample) => self.held = sample.clamp(-1.0, 1.0),
                None => {
                    self.phase = 0.0;
                    break;
                }
            }
        }
        self.held
    }

    fn begin_block(&mut self) {
        // Skip whatever piled up during the pause between cycles.
        while self.receiver.try_recv().is_ok() {}
        self.phase = 0.0;
        self.stalled = false;
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks the f32 configuration whose rate is closest to `sample_rate`
/// 3. Sets up a callback that feeds the returned `CpalSource`
///
/// # Returns
/// * `Ok((stream, source))` - The running stream (keep it alive) and its source
/// * `Err(e)` - Error if no usable device or configuration exists
pub fn start_audio_capture(sample_rate: u32) -> Result<(cpal::Stream, CpalSource)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, sample_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let device_rate = sample_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(device_rate));
    let channels = usize::from(config.channels().max(1));
    let config: cpal::StreamConfig = config.into();

    info!(
        "Selected device rate: {} Hz ({} channel(s)), analysis rate: {} Hz",
        device_rate, channels, sample_rate
    );

    // Half a second of audio is plenty; the sampler drains it every block.
    let (sender, receiver) = crossbeam_channel::bounded(device_rate as usize / 2);

    let err_fn = |err| error!("An error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            for frame in data.chunks(channels) {
                // Drop samples if the pipeline is not keeping up.
                let _ = sender.try_send(frame[0]);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, CpalSource::new(receiver, device_rate, sample_rate)))
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float configurations are considered. Among those, the range
/// closest to the target rate wins, then the one with the fewest channels.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if target_rate < min {
                min - target_rate
            } else {
                target_rate.saturating_sub(max)
            };
            (distance, c.channels())
        })
}
