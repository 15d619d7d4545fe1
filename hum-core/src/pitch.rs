//! # Pitch Module
//!
//! Peak extraction from a magnitude spectrum and the exponential smoothing
//! applied to successive peak frequencies.

/// Finds the dominant frequency of a magnitude spectrum.
///
/// The loudest strict local maximum among bins `1..len-1` is refined with
/// parabolic interpolation across its two neighbours, giving sub-bin accuracy.
/// For symmetric neighbours the result is exactly the bin's center frequency.
///
/// # Arguments
/// * `magnitudes` - Lower half magnitude spectrum (`block_size / 2` bins)
/// * `sample_rate` - Sample rate in Hz
/// * `block_size` - Number of samples the spectrum was computed from
///
/// # Returns
/// * Peak frequency in `[0, sample_rate / 2)`, or 0.0 if the spectrum has no peak
pub fn find_peak_frequency(magnitudes: &[f32], sample_rate: u32, block_size: usize) -> f32 {
    if magnitudes.len() < 3 || block_size == 0 {
        return 0.0;
    }

    let mut peak_bin = 0;
    let mut peak_magnitude = 0.0_f32;
    for i in 1..magnitudes.len() - 1 {
        let y = magnitudes[i];
        if magnitudes[i - 1] < y && y > magnitudes[i + 1] && y > peak_magnitude {
            peak_magnitude = y;
            peak_bin = i;
        }
    }
    if peak_bin == 0 {
        return 0.0;
    }

    let y1 = magnitudes[peak_bin - 1];
    let y2 = magnitudes[peak_bin];
    let y3 = magnitudes[peak_bin + 1];

    // Strictly negative for a strict local maximum.
    let denominator = y1 - 2.0 * y2 + y3;
    let peak_shift = if denominator < 0.0 {
        0.5 * (y1 - y3) / denominator
    } else {
        0.0
    };

    let frequency = (peak_bin as f32 + peak_shift) * sample_rate as f32 / block_size as f32;
    let nyquist = sample_rate as f32 / 2.0;
    if frequency.is_finite() && frequency < nyquist {
        frequency.max(0.0)
    } else {
        0.0
    }
}

/// Single-pole low-pass filter over successive peak frequencies.
///
/// While a tone is present, each new frequency moves the output by
/// `(1 - alpha)` of the distance to it. The first frequency after silence
/// reseeds the filter directly so a new tone is reported without lag.
#[derive(Debug, Clone)]
pub struct PitchSmoother {
    alpha: f32,
    rc_prev: f32,
    active: bool,
}

impl PitchSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            rc_prev: 0.0,
            active: false,
        }
    }

    /// Feeds one cycle's peak frequency and silence gate.
    ///
    /// Returns the smoothed frequency, or 0.0 when the gate is closed.
    pub fn update(&mut self, frequency: f32, tone_present: bool) -> f32 {
        if !tone_present {
            // The stale value is never decayed; the next tone replaces it.
            self.active = false;
            return 0.0;
        }
        if !self.active {
            self.active = true;
            self.rc_prev = frequency;
            return frequency;
        }
        self.rc_prev = self.alpha * self.rc_prev + (1.0 - self.alpha) * frequency;
        self.rc_prev
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    /// The last smoothed value, meaningful only while active.
    #[cfg(test)]
    pub(crate) fn value(&self) -> f32 {
        self.rc_prev
    }
}
