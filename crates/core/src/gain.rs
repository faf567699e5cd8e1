//! Replay-gain measurements and album aggregation.

use serde::{Deserialize, Serialize};

/// A loudness measurement: gain in dB and peak sample amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayGain {
    pub gain_db: f64,
    pub peak: f64,
}

impl ReplayGain {
    pub fn new(gain_db: f64, peak: f64) -> Self {
        Self { gain_db, peak }
    }

    /// Gain formatted for a tag value, e.g. `-6.52 dB`.
    pub fn gain_tag(&self) -> String {
        format!("{:.2} dB", self.gain_db)
    }

    /// Peak formatted for a tag value, e.g. `0.98765432`.
    pub fn peak_tag(&self) -> String {
        format!("{:.8}", self.peak)
    }
}

/// Collects per-track measurements until the album is complete.
///
/// The album figure is only available once exactly `expected` measurements
/// have been added.
#[derive(Debug, Clone)]
pub struct AlbumGain {
    expected: usize,
    measurements: Vec<ReplayGain>,
}

impl AlbumGain {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            measurements: Vec::with_capacity(expected),
        }
    }

    pub fn add(&mut self, gain: ReplayGain) {
        self.measurements.push(gain);
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.expected > 0 && self.measurements.len() == self.expected
    }

    /// The album-level figure, or `None` while measurements are missing.
    pub fn result(&self) -> Option<ReplayGain> {
        if !self.is_complete() {
            return None;
        }
        Some(Self::combine(&self.measurements))
    }

    pub fn clear(&mut self) {
        self.measurements.clear();
    }

    /// Combines track measurements into one album measurement.
    ///
    /// The gain is the energy mean of the track gains and the peak is the
    /// loudest track peak. The result does not depend on input order beyond
    /// floating-point rounding.
    pub fn combine(measurements: &[ReplayGain]) -> ReplayGain {
        if measurements.is_empty() {
            return ReplayGain::new(0.0, 0.0);
        }

        let mut sorted: Vec<f64> = measurements.iter().map(|m| m.gain_db).collect();
        sorted.sort_by(f64::total_cmp);

        let energy: f64 = sorted.iter().map(|g| 10f64.powf(-g / 10.0)).sum::<f64>()
            / sorted.len() as f64;
        let gain_db = -10.0 * energy.log10();

        let peak = measurements
            .iter()
            .map(|m| m.peak)
            .fold(0.0_f64, f64::max);

        ReplayGain::new(gain_db, peak)
    }
}
