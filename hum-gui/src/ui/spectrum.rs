//! # Spectrum Widget
//!
//! Draws the magnitude spectrum of the latest block as a bar chart, one bar
//! per bin, with heights clamped to a fixed ceiling.

use iced::widget::canvas::{self, Geometry, Path};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Size, Theme, mouse};

/// Magnitude drawn as a full-height bar. Louder bins are clamped.
const DISPLAY_CEILING: f32 = 5.0;

pub struct Spectrum {
    /// Magnitude spectrum data from the analyzer
    data: Vec<f32>,
}

impl Spectrum {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for Spectrum {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if !bounds.width.is_finite() || !bounds.height.is_finite() || self.data.is_empty() {
            return vec![frame.into_geometry()];
        }

        let band_width = (bounds.width / self.data.len() as f32).floor().max(1.0);
        // Leave a one pixel gap between bars when there is room for it.
        let bar_width = if band_width > 1.0 { band_width - 1.0 } else { band_width };

        for (i, &magnitude) in self.data.iter().enumerate() {
            let level = if magnitude.is_finite() {
                magnitude.clamp(0.0, DISPLAY_CEILING) / DISPLAY_CEILING
            } else {
                0.0
            };
            let height = level * bounds.height;
            if height > 0.0 {
                let bar = Path::rectangle(
                    Point::new(i as f32 * band_width, bounds.height - height),
                    Size::new(bar_width, height),
                );
                frame.fill(&bar, Color::WHITE);
            }
        }

        vec![frame.into_geometry()]
    }
}
