//! # Humminger - Hum-to-MIDI Controller GUI
//!
//! Hum into the microphone, hold the pad, and the nearest note in the
//! reference band is played on the first available MIDI output.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Pipeline Thread**: Samples the microphone and runs the pitch pipeline
//! - **Communication**: Crossbeam channels for frames and control events
//! - **Updates**: 60 FPS polling of pipeline frames via subscription

mod ui;

use std::thread::{self, JoinHandle};

use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use hum_core::{
    Frame, audio,
    config::{self, PipelineConfig},
    events::{self, EventReceiver, EventSender},
    midi::MidiNoteSink,
    pipeline::Pipeline,
};
use iced::{Element, Event, Subscription, Theme, event, mouse, touch, window};
use log::{error, info, warn};
use ui::main_display::create_main_view;

/// Frames buffered between the pipeline and the GUI.
const FRAME_QUEUE_CAPACITY: usize = 8;

/// Environment variable holding part of the MIDI output port name to use.
const MIDI_PORT_ENV: &str = "HUMMINGER_MIDI_PORT";

/// Main entry point for the Humminger application.
pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    info!("Starting Humminger...");
    let result = iced::application("Humminger", HumApp::update, HumApp::view)
        .subscription(HumApp::subscription)
        .theme(HumApp::theme)
        .run();
    info!("Application finished with result: {:?}", result);
    result
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The hum pad was pressed.
    Engage,
    /// The hum pad was released, or the pointer holding it was let go
    /// anywhere in the window.
    Release,
    /// Timer tick for real-time updates.
    Tick,
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub pipeline_active: bool,
    pub last_frame: Option<Frame>,
    /// Whether the hum pad is currently held.
    pub engaged: bool,
}

#[derive(Debug)]
struct HumApp {
    worker: Option<PipelineWorker>,
    frame_receiver: Receiver<Frame>,
    events: EventSender,
    display_data: AppDisplayData,
}

/// Pipeline thread management structure.
///
/// Dropping the worker signals the thread to stop and waits for it.
#[derive(Debug)]
struct PipelineWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        info!("Shutting down pipeline worker...");
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("Pipeline thread panicked");
            }
        }
    }
}

impl Default for HumApp {
    /// Creates the application and starts the pipeline thread.
    fn default() -> Self {
        let (events, event_receiver) = events::event_queue(config::EVENT_QUEUE_CAPACITY);
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let link_events = events.clone();
        let thread_handle = thread::spawn(move || {
            info!("Pipeline thread starting...");
            if let Err(e) = run_pipeline(event_receiver, link_events, frame_tx, shutdown_rx) {
                error!("Pipeline stopped: {}", e);
            }
            info!("Pipeline thread finished");
        });

        Self {
            worker: Some(PipelineWorker {
                shutdown_tx,
                thread_handle: Some(thread_handle),
            }),
            frame_receiver: frame_rx,
            events,
            display_data: AppDisplayData {
                pipeline_active: true,
                last_frame: None,
                engaged: false,
            },
        }
    }
}

impl HumApp {
    fn update(&mut self, message: Message) {
        match message {
            Message::Engage => {
                if !self.display_data.engaged {
                    self.display_data.engaged = true;
                    self.events.engage();
                }
            }
            Message::Release => {
                // The pad and the window-wide listener can both report the
                // same release.
                if self.display_data.engaged {
                    self.display_data.engaged = false;
                    self.events.release();
                }
            }
            Message::Tick => loop {
                // Only the newest frame is shown; older ones are skipped.
                match self.frame_receiver.try_recv() {
                    Ok(frame) => self.display_data.last_frame = Some(frame),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if self.display_data.pipeline_active {
                            warn!("Pipeline is no longer producing frames");
                            self.display_data.pipeline_active = false;
                            self.worker = None;
                        }
                        break;
                    }
                }
            },
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Fires every 16ms (60 FPS) to pull new frames from the pipeline.
    ///
    /// While the pad is held, pointer releases anywhere in the window are
    /// watched too, since the pad only sees releases over its own bounds.
    fn subscription(&self) -> Subscription<Message> {
        let tick = iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick);
        if self.display_data.engaged {
            Subscription::batch([tick, event::listen_with(pointer_release)])
        } else {
            tick
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Maps a left-button release or a lifted finger to `Message::Release`.
fn pointer_release(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
        | Event::Touch(touch::Event::FingerLifted { .. } | touch::Event::FingerLost { .. }) => {
            Some(Message::Release)
        }
        _ => None,
    }
}

/// Body of the pipeline thread: opens the microphone and MIDI output, then
/// cycles until shutdown.
fn run_pipeline(
    event_receiver: EventReceiver,
    link_events: EventSender,
    frames: Sender<Frame>,
    shutdown: Receiver<()>,
) -> anyhow::Result<()> {
    let config = PipelineConfig::default();
    let (stream, source) = audio::start_audio_capture(config.sample_rate)?;
    info!("Audio capture started");

    let sink = MidiNoteSink::new(std::env::var(MIDI_PORT_ENV).ok(), link_events);
    if !sink.is_connected() {
        warn!("No MIDI output yet, will keep trying in the background");
    }

    let mut pipeline = Pipeline::new(config, source, sink, event_receiver);
    pipeline.run(&frames, &shutdown);

    stream.pause()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hum_core::events::ControlEvent;
    use iced::Point;

    fn idle_app() -> (HumApp, EventReceiver) {
        let (events, receiver) = events::event_queue(8);
        let (_frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        let app = HumApp {
            worker: None,
            frame_receiver: frame_rx,
            events,
            display_data: AppDisplayData {
                pipeline_active: true,
                last_frame: None,
                engaged: false,
            },
        };
        (app, receiver)
    }

    fn release_of(event: Event) -> Option<Message> {
        pointer_release(event, event::Status::Ignored, window::Id::unique())
    }

    #[test]
    fn left_button_up_anywhere_releases() {
        let event = Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left));
        assert_eq!(release_of(event), Some(Message::Release));
    }

    #[test]
    fn other_pointer_events_are_ignored() {
        let right = Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Right));
        let press = Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left));
        assert_eq!(release_of(right), None);
        assert_eq!(release_of(press), None);
    }

    #[test]
    fn lifted_or_lost_finger_releases() {
        let lifted = Event::Touch(touch::Event::FingerLifted {
            id: touch::Finger(1),
            position: Point::ORIGIN,
        });
        let lost = Event::Touch(touch::Event::FingerLost {
            id: touch::Finger(1),
            position: Point::ORIGIN,
        });
        assert_eq!(release_of(lifted), Some(Message::Release));
        assert_eq!(release_of(lost), Some(Message::Release));
    }

    #[test]
    fn release_off_the_pad_ends_the_hold() {
        let (mut app, receiver) = idle_app();
        app.update(Message::Engage);
        assert!(app.display_data.engaged);

        // Dragged off the pad: only the window-wide listener reports the release.
        let event = Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left));
        app.update(release_of(event).unwrap());
        assert!(!app.display_data.engaged);

        // The next press starts a new note straight away.
        app.update(Message::Engage);
        let sent: Vec<ControlEvent> = receiver.drain().collect();
        let expected = [ControlEvent::Engage, ControlEvent::Release, ControlEvent::Engage];
        assert_eq!(sent, expected);
    }

    #[test]
    fn duplicate_release_sends_one_edge() {
        let (mut app, receiver) = idle_app();
        app.update(Message::Release);
        app.update(Message::Engage);
        app.update(Message::Engage);
        app.update(Message::Release);
        app.update(Message::Release);
        let sent: Vec<ControlEvent> = receiver.drain().collect();
        assert_eq!(sent, vec![ControlEvent::Engage, ControlEvent::Release]);
    }
}
