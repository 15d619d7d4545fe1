//! # Note Mapping Module
//!
//! Quantizes a smoothed frequency into a discrete note index with a single
//! linear map from a reference frequency band onto a note band, and names
//! MIDI note numbers for display.

use once_cell::sync::Lazy;

use crate::config::NoteBand;

/// Maps a frequency in Hz onto a note index.
///
/// ```text
/// note_range     = note_top - note_bottom
/// freq_range     = freq_top - freq_bottom
/// half_step_bias = freq_range / note_range / 2 + freq_offset
/// note           = floor((f - freq_bottom + half_step_bias) * note_range / freq_range) + note_bottom
/// ```
///
/// No clamping is applied: frequencies outside the band map to notes outside
/// `[note_bottom, note_top]`.
pub fn note_for_frequency(band: &NoteBand, frequency: f32) -> i32 {
    let note_range = (band.note_top - band.note_bottom) as f32;
    let freq_range = band.freq_top - band.freq_bottom;
    if note_range == 0.0 || freq_range == 0.0 {
        return band.note_bottom;
    }
    let half_step_bias = freq_range / note_range / 2.0 + band.freq_offset;
    let steps = ((frequency - band.freq_bottom + half_step_bias) * note_range / freq_range).floor();
    steps as i32 + band.note_bottom
}

/// MIDI note names 0..=127, with middle C (60) as "C4".
static NOTE_NAMES: Lazy<Vec<String>> = Lazy::new(|| {
    const PITCH_CLASSES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    (0..128)
        .map(|note: i32| format!("{}{}", PITCH_CLASSES[(note % 12) as usize], note / 12 - 1))
        .collect()
});

/// Returns the name of a MIDI note number, or `None` outside 0..=127.
pub fn note_name(note: i32) -> Option<&'static str> {
    usize::try_from(note)
        .ok()
        .and_then(|index| NOTE_NAMES.get(index))
        .map(String::as_str)
}
