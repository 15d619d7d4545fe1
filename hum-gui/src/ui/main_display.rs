//! # Main Display Module
//!
//! Layout of the Humminger window: the smoothed frequency readout, the hum
//! pad, the spectrum and a status line with peak, note and MIDI link.

use hum_core::{Readout, tuning};
use iced::widget::{Space, column, container, horizontal_space, mouse_area, row, text};
use iced::{Alignment, Background, Border, Color, Element, Length};

use super::spectrum;

const PAD_HEIGHT: f32 = 110.0;

/// Creates the complete main application view
pub fn create_main_view(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    if !data.pipeline_active {
        return container(text("No audio input").size(40))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into();
    }

    let readout = data
        .last_frame
        .as_ref()
        .map(|frame| frame.readout)
        .unwrap_or_default();
    let peak_frequency = data.last_frame.as_ref().map_or(0.0, |frame| frame.peak_frequency);

    let main_content = column![
        text("Humminger").size(28),
        create_frequency_panel(readout),
        create_hum_pad(data.engaged),
        Space::with_height(10),
        create_spectrum_panel(data),
        create_status_line(peak_frequency, readout),
    ]
    .spacing(10)
    .padding(20)
    .align_x(Alignment::Center);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Smoothed frequency in five digits, the way the device showed it.
fn create_frequency_panel(readout: Readout) -> Element<'static, crate::Message> {
    row![
        text(format!("{:05}", readout.frequency)).size(64),
        Space::with_width(10),
        text("Hz").size(24),
    ]
    .align_y(Alignment::End)
    .into()
}

/// The press-and-hold pad. Press sends Engage, release sends Release.
fn create_hum_pad(engaged: bool) -> Element<'static, crate::Message> {
    let (fill, ink) = if engaged {
        (Color::from_rgb8(0x7B, 0x7D, 0x7B), Color::WHITE)
    } else {
        (Color::BLACK, Color::from_rgb8(0xC6, 0xC3, 0xC6))
    };

    let pad = container(text("HUMMING").size(32))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(PAD_HEIGHT))
        .style(move |_theme| container::Style {
            background: Some(Background::Color(fill)),
            text_color: Some(ink),
            border: Border {
                color: ink,
                width: 2.0,
                radius: 8.0.into(),
            },
            ..container::Style::default()
        });

    mouse_area(pad)
        .on_press(crate::Message::Engage)
        .on_release(crate::Message::Release)
        .into()
}

/// Creates the spectrum panel widget.
fn create_spectrum_panel(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    let magnitudes = data
        .last_frame
        .as_ref()
        .map(|frame| frame.magnitudes.clone())
        .unwrap_or_default();

    container(spectrum::Spectrum::new(magnitudes).view())
        .width(Length::Fill)
        .height(Length::Fixed(140.0))
        .into()
}

fn create_status_line(peak_frequency: f32, readout: Readout) -> Element<'static, crate::Message> {
    let note_name = if readout.note == 0 {
        "--"
    } else {
        tuning::note_name(readout.note).unwrap_or("--")
    };
    let link = if readout.connected { "[MIDI]" } else { "" };

    row![
        text(format!("Peak: {:.0}", peak_frequency)).size(16),
        Space::with_width(20),
        text(format!("NOTE: {} ({})", readout.note, note_name)).size(16),
        horizontal_space(),
        text(link).size(16),
    ]
    .width(Length::Fill)
    .align_y(Alignment::Center)
    .into()
}
