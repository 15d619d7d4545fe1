//! # Pipeline Module
//!
//! Wires the stages together: Sampler -> Spectral Analyzer -> silence gate ->
//! Pitch Smoother -> Note Mapper, then applies queued control events to the
//! note trigger. All state that survives a cycle lives in `PipelineContext`.

use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use log::info;

use crate::audio::{SampleSource, Sampler};
use crate::config::{NoteBand, PipelineConfig};
use crate::events::{ControlEvent, EventReceiver};
use crate::fft::SpectralAnalyzer;
use crate::midi::NoteSink;
use crate::pitch::PitchSmoother;
use crate::trigger::NoteTrigger;
use crate::tuning;
use crate::{Frame, Readout};

/// Process-lifetime pipeline state, updated once per cycle.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    band: NoteBand,
    silence_ceiling_hz: f32,
    smoother: PitchSmoother,
    smoothed_hz: f32,
    pending_note: i32,
    trigger: NoteTrigger,
    connected: bool,
}

impl PipelineContext {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            band: config.band,
            silence_ceiling_hz: config.silence_ceiling_hz,
            smoother: PitchSmoother::new(config.smoothing_factor),
            smoothed_hz: 0.0,
            pending_note: 0,
            trigger: NoteTrigger::new(config.midi_channel, config.velocity),
            connected: false,
        }
    }

    /// Feeds one cycle's raw peak frequency and updates the pending note.
    pub fn advance(&mut self, peak_hz: f32) -> Readout {
        let tone_present = peak_hz < self.silence_ceiling_hz;
        self.smoothed_hz = self.smoother.update(peak_hz, tone_present);
        self.pending_note = if tone_present {
            tuning::note_for_frequency(&self.band, self.smoothed_hz)
        } else {
            0
        };
        self.readout()
    }

    /// Applies one control event against the latest pending note.
    pub fn handle<K: NoteSink + ?Sized>(&mut self, event: ControlEvent, sink: &mut K) {
        match event {
            ControlEvent::Engage => {
                self.trigger.engage(self.pending_note, sink);
            }
            ControlEvent::Release => {
                self.trigger.release(sink);
            }
            ControlEvent::Connected => self.connected = true,
            ControlEvent::Disconnected => self.connected = false,
        }
    }

    pub fn readout(&self) -> Readout {
        Readout {
            frequency: self.smoothed_hz.max(0.0) as u32,
            note: self.pending_note,
            connected: self.connected,
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_note(&self) -> i32 {
        self.pending_note
    }

    /// The note currently sounding on the sink, or 0.
    #[cfg(test)]
    pub(crate) fn current_note(&self) -> i32 {
        self.trigger.current_note()
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self) -> bool {
        self.connected
    }
}

/// The complete pitch-to-note pipeline around one sample source and sink.
pub struct Pipeline<S, K> {
    config: PipelineConfig,
    sampler: Sampler<S>,
    analyzer: SpectralAnalyzer,
    block: Vec<f32>,
    context: PipelineContext,
    sink: K,
    events: EventReceiver,
}

impl<S: SampleSource, K: NoteSink> Pipeline<S, K> {
    /// # Panics
    /// * If `config.block_size` is not a power of two
    pub fn new(config: PipelineConfig, source: S, sink: K, events: EventReceiver) -> Self {
        Self {
            sampler: Sampler::new(source, config.sample_rate),
            analyzer: SpectralAnalyzer::new(config.block_size, config.sample_rate),
            block: vec![0.0; config.block_size],
            context: PipelineContext::new(&config),
            sink,
            events,
            config,
        }
    }

    /// Runs a single cycle and returns what the renderer should show.
    ///
    /// Blocks for one sample block duration.
    pub fn cycle(&mut self) -> Frame {
        self.sampler.fill(&mut self.block);
        let peak_frequency = self.analyzer.analyze(&mut self.block);
        self.context.advance(peak_frequency);

        for event in self.events.drain() {
            self.context.handle(event, &mut self.sink);
        }
        self.sink.maintain();

        Frame {
            magnitudes: self.analyzer.magnitudes().to_vec(),
            peak_frequency,
            readout: self.context.readout(),
        }
    }

    /// Cycles until `shutdown` fires or the frame receiver is dropped.
    ///
    /// Frames are offered without blocking; a renderer that falls behind
    /// simply misses frames.
    pub fn run(&mut self, frames: &Sender<Frame>, shutdown: &Receiver<()>) {
        info!(
            "Pipeline running: {} Hz, {} samples per block ({:?}), {:.2} Hz per bin",
            self.config.sample_rate,
            self.config.block_size,
            self.config.block_duration(),
            self.config.bin_width()
        );
        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Disconnected) => {
                    info!("Pipeline received shutdown signal");
                    break;
                }
            }

            let frame = self.cycle();
            if let Err(TrySendError::Disconnected(_)) = frames.try_send(frame) {
                info!("Frame receiver closed");
                break;
            }

            thread::sleep(self.config.cycle_delay);
        }

        // Leave nothing hanging on the synth once the pipeline stops.
        self.context.handle(ControlEvent::Release, &mut self.sink);
    }

    #[cfg(test)]
    pub(crate) fn context(&self) -> &PipelineContext {
        &self.context
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &K {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_queue;
    use crate::midi::RecordingSink;

    struct SineSource {
        phase: f32,
        step: f32,
    }

    impl SineSource {
        fn new(frequency: f32, sample_rate: u32) -> Self {
            Self {
                phase: 0.0,
                step: 2.0 * std::f32::consts::PI * frequency / sample_rate as f32,
            }
        }
    }

    impl SampleSource for SineSource {
        fn read_sample(&mut self) -> f32 {
            let sample = 0.5 * self.phase.sin();
            self.phase = (self.phase + self.step) % (2.0 * std::f32::consts::PI);
            sample
        }
    }

    #[test]
    fn starts_neutral() {
        let context = PipelineContext::new(&PipelineConfig::default());
        assert_eq!(
            context.readout(),
            Readout {
                frequency: 0,
                note: 0,
                connected: false
            }
        );
        assert_eq!(context.current_note(), 0);
    }

    #[test]
    fn a_second_of_high_peaks_plays_nothing() {
        let config = PipelineConfig::default();
        let cycles_per_second = config.sample_rate as usize / config.block_size;
        let mut context = PipelineContext::new(&config);
        let mut sink = RecordingSink::default();

        for _ in 0..cycles_per_second {
            let readout = context.advance(5_000.0);
            assert_eq!(readout.frequency, 0);
            assert_eq!(readout.note, 0);
            context.handle(ControlEvent::Engage, &mut sink);
            context.handle(ControlEvent::Release, &mut sink);
        }
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn steady_hum_reads_flat() {
        let mut context = PipelineContext::new(&PipelineConfig::default());
        let frequencies: Vec<u32> = [520.0, 520.0, 520.0]
            .iter()
            .map(|&f| context.advance(f).frequency)
            .collect();
        assert_eq!(frequencies, vec![520, 520, 520]);
    }

    #[test]
    fn jump_is_smoothed() {
        let mut context = PipelineContext::new(&PipelineConfig::default());
        assert_eq!(context.advance(520.0).frequency, 520);
        assert_eq!(context.advance(1_350.0).frequency, 603);
    }

    #[test]
    fn silence_clears_pending_note_and_reseeds() {
        let mut context = PipelineContext::new(&PipelineConfig::default());
        context.advance(800.0);
        assert_ne!(context.pending_note(), 0);
        context.advance(3_000.0);
        assert_eq!(context.pending_note(), 0);
        assert_eq!(context.advance(1_200.0).frequency, 1_200);
    }

    #[test]
    fn engage_plays_latest_pending_note() {
        let config = PipelineConfig::default();
        let mut context = PipelineContext::new(&config);
        let mut sink = RecordingSink::default();

        context.advance(700.0);
        let note = context.pending_note();
        assert_eq!(note, tuning::note_for_frequency(&config.band, 700.0));
        context.handle(ControlEvent::Engage, &mut sink);
        assert_eq!(context.current_note(), note);

        context.advance(1_100.0);
        context.handle(ControlEvent::Release, &mut sink);
        assert_eq!(sink.calls, vec![(true, note), (false, note)]);
    }

    #[test]
    fn connectivity_only_changes_the_readout() {
        let mut context = PipelineContext::new(&PipelineConfig::default());
        let mut sink = RecordingSink::default();
        context.handle(ControlEvent::Connected, &mut sink);
        assert!(context.readout().connected);
        context.handle(ControlEvent::Disconnected, &mut sink);
        assert!(!context.is_connected());

        context.advance(900.0);
        context.handle(ControlEvent::Engage, &mut sink);
        assert_eq!(sink.calls.len(), 1);
    }

    #[test]
    fn cycle_turns_a_hum_into_a_note() {
        let config = PipelineConfig::default();
        let (events, receiver) = event_queue(4);
        let source = SineSource::new(1_000.0, config.sample_rate);
        let sink = RecordingSink::default();
        let mut pipeline = Pipeline::new(config.clone(), source, sink, receiver);

        events.engage();
        events.connected();
        let frame = pipeline.cycle();

        assert_eq!(frame.magnitudes.len(), config.block_size / 2);
        assert!((frame.peak_frequency - 1_000.0).abs() < config.bin_width());
        assert_eq!(frame.readout.frequency, frame.peak_frequency as u32);
        assert!(frame.readout.connected);
        assert_ne!(frame.readout.note, 0);
        assert_eq!(pipeline.sink().calls, vec![(true, frame.readout.note)]);
        assert_eq!(pipeline.context().current_note(), frame.readout.note);
    }

    #[test]
    fn run_stops_on_shutdown_and_releases() {
        let config = PipelineConfig::default();
        let (events, receiver) = event_queue(4);
        let source = SineSource::new(800.0, config.sample_rate);
        let mut pipeline = Pipeline::new(config, source, RecordingSink::default(), receiver);
        events.engage();
        pipeline.cycle();

        let (frame_tx, frame_rx) = crossbeam_channel::bounded(4);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        shutdown_tx.send(()).unwrap();
        pipeline.run(&frame_tx, &shutdown_rx);

        assert!(frame_rx.try_recv().is_err());
        let calls = &pipeline.sink().calls;
        assert_eq!(calls.len(), 2);
        assert!(!calls[1].0);
        assert_eq!(pipeline.context().current_note(), 0);
    }

    #[test]
    fn run_stops_when_renderer_is_gone() {
        let config = PipelineConfig::default();
        let (_events, receiver) = event_queue(4);
        let source = SineSource::new(800.0, config.sample_rate);
        let mut pipeline = Pipeline::new(config, source, RecordingSink::default(), receiver);

        let (frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        drop(frame_rx);
        let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        pipeline.run(&frame_tx, &shutdown_rx);

        assert!(pipeline.sink().calls.is_empty());
    }
}
