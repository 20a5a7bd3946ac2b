//! Feed-forward soft-knee compressor used by the normalization stage.
//!
//! Detection is stereo-linked (peak of the frame), the envelope follows with
//! separate attack and release coefficients, and a fixed makeup gain brings
//! compressed material back up so quiet and loud clips land closer together.
//!
//! `detect` and `apply` are separate so the envelope can keep tracking the
//! signal while the compressor is bypassed. Switching it in then starts from
//! the current level instead of a cold envelope.

use crate::constants::{
    COMPRESSOR_ATTACK_SECS, COMPRESSOR_KNEE_DB, COMPRESSOR_RATIO, COMPRESSOR_RELEASE_SECS,
    COMPRESSOR_THRESHOLD_DB,
};

/// Share of the full-scale gain reduction recovered as makeup gain.
const MAKEUP_FRACTION: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    pub attack_secs: f32,
    pub release_secs: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: COMPRESSOR_THRESHOLD_DB,
            knee_db: COMPRESSOR_KNEE_DB,
            ratio: COMPRESSOR_RATIO,
            attack_secs: COMPRESSOR_ATTACK_SECS,
            release_secs: COMPRESSOR_RELEASE_SECS,
        }
    }
}

impl CompressorParams {
    /// Static gain reduction in dB for a detector level in dBFS.
    pub fn gain_reduction_db(&self, input_db: f32) -> f32 {
        let half_knee = self.knee_db / 2.0;
        let slope = 1.0 - 1.0 / self.ratio;

        if input_db < self.threshold_db - half_knee {
            0.0
        } else if input_db > self.threshold_db + half_knee || self.knee_db <= 0.0 {
            (input_db - self.threshold_db) * slope
        } else {
            let knee_input = input_db - self.threshold_db + half_knee;
            (knee_input * knee_input) / (2.0 * self.knee_db) * slope
        }
    }

    pub fn makeup_db(&self) -> f32 {
        self.gain_reduction_db(0.0) * MAKEUP_FRACTION
    }
}

pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.max(1e-10).log10()
}

#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    attack_coeff: f32,
    release_coeff: f32,
    makeup_linear: f32,
    envelope: f32,
    primed: bool,
    gain_reduction_db: f32,
}

impl Compressor {
    pub fn new(params: CompressorParams, sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f32;
        Self {
            params,
            attack_coeff: (-1.0 / (params.attack_secs * sr)).exp(),
            release_coeff: (-1.0 / (params.release_secs * sr)).exp(),
            makeup_linear: db_to_linear(params.makeup_db()),
            envelope: 0.0,
            primed: false,
            gain_reduction_db: 0.0,
        }
    }

    /// Most recent gain reduction, for metering.
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    /// Forget the envelope, e.g. after a seek. The next detected frame
    /// seeds it directly.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.primed = false;
        self.gain_reduction_db = 0.0;
    }

    /// Advance the envelope by one interleaved frame without touching it.
    pub fn detect(&mut self, frame: &[f32]) {
        let peak = frame.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()));

        if self.primed {
            let coeff = if peak > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * peak;
        } else {
            self.envelope = peak;
            self.primed = true;
        }

        self.gain_reduction_db = self.params.gain_reduction_db(linear_to_db(self.envelope));
    }

    /// Linear gain for the current envelope, makeup included.
    pub fn gain(&self) -> f32 {
        db_to_linear(-self.gain_reduction_db) * self.makeup_linear
    }

    /// Scale a frame by the current gain.
    pub fn apply(&self, frame: &mut [f32]) {
        let gain = self.gain();
        for sample in frame.iter_mut() {
            *sample = (*sample * gain).clamp(-1.0, 1.0);
        }
    }

    /// Compress one interleaved frame in place.
    pub fn process_frame(&mut self, frame: &mut [f32]) {
        self.detect(frame);
        self.apply(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_reduction_below_knee() {
        let params = CompressorParams::default();
        assert_eq!(params.gain_reduction_db(-60.0), 0.0);
        // Knee spans -39..-9 dB
        assert_eq!(params.gain_reduction_db(-39.5), 0.0);
    }

    #[test]
    fn test_full_ratio_above_knee() {
        let params = CompressorParams::default();
        let expected = 24.0 * (1.0 - 1.0 / 12.0);
        assert!((params.gain_reduction_db(0.0) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_knee_is_continuous() {
        let params = CompressorParams::default();
        let below = params.gain_reduction_db(-9.001);
        let above = params.gain_reduction_db(-8.999);
        assert!((below - above).abs() < 0.01);
        assert!(params.gain_reduction_db(-24.0) > 0.0);
    }

    #[test]
    fn test_db_conversion() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!((linear_to_db(0.1) + 20.0).abs() < 1e-4);
        assert!(linear_to_db(0.0) < -150.0);
    }

    #[test]
    fn test_loud_signal_is_reduced_and_bounded() {
        let mut comp = Compressor::new(CompressorParams::default(), 44100);
        let mut last = [0.0_f32; 2];
        for _ in 0..44100 {
            let mut frame = [0.9_f32, -0.9];
            comp.process_frame(&mut frame);
            last = frame;
        }
        assert!(comp.gain_reduction_db() > 10.0);
        assert!(last[0] <= 1.0 && last[1] >= -1.0);
        assert!(last[0] < 0.9 * db_to_linear(CompressorParams::default().makeup_db()));
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut comp = Compressor::new(CompressorParams::default(), 48000);
        let mut frame = [0.0_f32; 2];
        comp.process_frame(&mut frame);
        assert_eq!(frame, [0.0, 0.0]);
    }

    #[test]
    fn test_reset_clears_envelope() {
        let mut comp = Compressor::new(CompressorParams::default(), 44100);
        for _ in 0..1000 {
            comp.process_frame(&mut [1.0, 1.0]);
        }
        comp.reset();
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_cold_start_does_not_overshoot() {
        let mut comp = Compressor::new(CompressorParams::default(), 44100);
        for _ in 0..2000 {
            let mut frame = [0.5_f32, -0.5];
            comp.process_frame(&mut frame);
            assert!(frame[0] < 1.0 && frame[1] > -1.0);
        }
    }

    #[test]
    fn test_detect_keeps_envelope_warm_while_bypassed() {
        let mut comp = Compressor::new(CompressorParams::default(), 44100);
        for _ in 0..44100 {
            comp.detect(&[0.5, -0.5]);
        }
        let mut frame = [0.5_f32, -0.5];
        comp.apply(&mut frame);
        // -6 dBFS sits above the knee, so the makeup never wins
        assert!(frame[0] < 0.5);
        assert!(frame[0] > 0.2);
    }
}
