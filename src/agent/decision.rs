use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decimal places kept on the decision threshold.
pub const THRESHOLD_PRECISION: i32 = 4;

/// Rounds `value` to `places` decimal places, ties to even.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Running bounds of every decision value seen while training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionSpectrum {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
}

impl DecisionSpectrum {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Widens the spectrum if `decision` falls outside it. Returns whether a
    /// bound moved.
    ///
    /// Only one bound moves per call: a value below `min` is never also
    /// checked against `max`.
    pub fn widen(&mut self, decision: f64) -> bool {
        if decision < self.min {
            debug!("Updating MIN: {} -> {}", self.min, decision);
            self.min = decision;
            true
        } else if decision > self.max {
            debug!("Updating MAX: {} -> {}", self.max, decision);
            self.max = decision;
            true
        } else {
            false
        }
    }

    pub fn midpoint(&self) -> f64 {
        round_to((self.min + self.max) / 2.0, THRESHOLD_PRECISION)
    }
}

impl fmt::Display for DecisionSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{min: {}, max: {}}}", self.min, self.max)
    }
}

/// The decision spectrum together with the threshold derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecisionStats {
    spectrum: DecisionSpectrum,
    threshold: f64,
}

impl DecisionStats {
    pub fn new(spectrum: DecisionSpectrum, threshold: f64) -> Self {
        Self {
            spectrum,
            threshold,
        }
    }

    pub fn spectrum(&self) -> DecisionSpectrum {
        self.spectrum
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Folds a decision value into the spectrum and recentres the threshold.
    /// Returns the new threshold when it changed.
    pub fn update(&mut self, decision: f64) -> Option<f64> {
        self.spectrum.widen(decision);
        let new_threshold = self.spectrum.midpoint();
        if new_threshold != self.threshold {
            self.threshold = new_threshold;
            debug!("Updated decision threshold: {}", new_threshold);
            Some(new_threshold)
        } else {
            None
        }
    }
}
