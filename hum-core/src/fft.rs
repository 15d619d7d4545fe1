//! # Fast Fourier Transform (FFT) Module
//!
//! This module turns one block of samples into a magnitude spectrum and its
//! dominant frequency. Every buffer is allocated once when the analyzer is
//! built and reused in place for each block.
//!
//! ## Steps
//! 1. DC offset removal (sample 0 excluded, see `remove_dc_offset`)
//! 2. Hamming windowing
//! 3. Forward FFT using RustFFT
//! 4. Complex to magnitude conversion of the lower half spectrum
//! 5. Interpolated peak extraction

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::pitch;

/// Removes the DC offset from every sample except the first.
///
/// The mean is taken over `signal[1..]` and subtracted from `signal[1..]`;
/// `signal[0]` is left untouched.
pub fn remove_dc_offset(signal: &mut [f32]) {
    if signal.len() < 2 {
        return;
    }
    let tail = &mut signal[1..];
    let mean = tail.iter().sum::<f32>() / tail.len() as f32;
    for sample in tail.iter_mut() {
        *sample -= mean;
    }
}

/// Multiplies the real part of `buffer` by a Hamming window of the same length.
fn apply_hamming_window(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let ratio = i as f32 / n_minus_1;
        sample.re *= 0.54 - 0.46 * (2.0 * std::f32::consts::PI * ratio).cos();
    }
}

/// Owns the signal buffer, FFT plan and magnitude spectrum of the pipeline.
pub struct SpectralAnalyzer {
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    signal: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectralAnalyzer {
    /// Plans a forward FFT for `block_size` samples.
    ///
    /// # Panics
    /// * If `block_size` is not a power of two
    pub fn new(block_size: usize, sample_rate: u32) -> Self {
        assert!(
            block_size.is_power_of_two(),
            "block size must be a power of two"
        );
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(block_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            sample_rate,
            fft,
            signal: vec![Complex::default(); block_size],
            scratch,
            magnitudes: vec![0.0; block_size / 2],
        }
    }

    /// Runs the full analysis on `block` (modified in place by DC removal)
    /// and returns the peak frequency in Hz.
    ///
    /// The result is always within `[0, sample_rate / 2)`.
    ///
    /// # Panics
    /// * If `block.len()` differs from the planned block size
    pub fn analyze(&mut self, block: &mut [f32]) -> f32 {
        assert_eq!(
            block.len(),
            self.signal.len(),
            "input block size must equal the planned block size"
        );

        remove_dc_offset(block);
        for (slot, &sample) in self.signal.iter_mut().zip(block.iter()) {
            *slot = Complex { re: sample, im: 0.0 };
        }
        apply_hamming_window(&mut self.signal);

        self.fft
            .process_with_scratch(&mut self.signal, &mut self.scratch);

        // Only the first half is meaningful for a real input.
        for (magnitude, bin) in self.magnitudes.iter_mut().zip(self.signal.iter()) {
            *magnitude = bin.norm();
        }

        pitch::find_peak_frequency(&self.magnitudes, self.sample_rate, self.signal.len())
    }

    /// The magnitude spectrum of the last analyzed block (`block_size / 2` bins).
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_sine(sample_rate: f32, frequency: f32, sample_count: usize) -> Vec<f32> {
        (0..sample_count)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn constant_block_is_zeroed_after_first_sample() {
        for value in [0.0_f32, 0.25, -3.0, 17.5] {
            let mut block = [value; 64];
            remove_dc_offset(&mut block);
            assert_eq!(block[0], value);
            assert!(block[1..].iter().all(|s| s.abs() < 1e-5));
        }
    }

    #[test]
    fn dc_removal_ignores_first_sample_in_mean() {
        let mut block = [100.0, 1.0, 2.0, 3.0];
        remove_dc_offset(&mut block);
        assert_eq!(block, [100.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn hamming_window_endpoints_and_center() {
        let mut buffer = vec![Complex { re: 1.0_f32, im: 0.0 }; 9];
        apply_hamming_window(&mut buffer);
        assert!((buffer[0].re - 0.08).abs() < 1e-6);
        assert!((buffer[4].re - 1.0).abs() < 1e-6);
        assert!((buffer[8].re - 0.08).abs() < 1e-6);
    }

    #[test]
    fn sine_peak_is_within_one_bin() {
        let sample_rate = 40_000;
        let block_size = 256;
        let bin_width = sample_rate as f32 / block_size as f32;
        let mut analyzer = SpectralAnalyzer::new(block_size, sample_rate);

        for frequency in [600.0_f32, 880.0, 1000.0, 1250.0, 2500.0, 7000.0] {
            let mut block = generate_sine(sample_rate as f32, frequency, block_size);
            let peak = analyzer.analyze(&mut block);
            assert!(
                (peak - frequency).abs() < bin_width,
                "expected {} Hz, got {} Hz",
                frequency,
                peak
            );
        }
    }

    #[test]
    fn magnitudes_cover_half_the_block() {
        let mut analyzer = SpectralAnalyzer::new(128, 8_000);
        let mut block = generate_sine(8_000.0, 1_000.0, 128);
        analyzer.analyze(&mut block);
        assert_eq!(analyzer.magnitudes().len(), 64);
        let loudest = analyzer
            .magnitudes()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(loudest, Some(16));
    }

    #[test]
    fn silent_block_reports_zero() {
        let mut analyzer = SpectralAnalyzer::new(256, 40_000);
        let mut block = vec![0.0_f32; 256];
        assert_eq!(analyzer.analyze(&mut block), 0.0);
    }

    #[test]
    #[should_panic]
    fn rejects_non_power_of_two() {
        SpectralAnalyzer::new(300, 40_000);
    }
}
