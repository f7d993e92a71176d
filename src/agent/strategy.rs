use std::fmt;

use rand::Rng;

use crate::{
    env::{Observation, OBSERVATION_SIZE},
    error::SearchError,
};

/// A linear decision strategy: one weight per observation value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strategy([f64; OBSERVATION_SIZE]);

impl Strategy {
    pub fn new(weights: [f64; OBSERVATION_SIZE]) -> Self {
        Self(weights)
    }

    /// Samples every weight uniformly from `[0, 1)`.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut weights = [0.0; OBSERVATION_SIZE];
        for w in weights.iter_mut() {
            *w = rng.gen::<f64>();
        }
        Self(weights)
    }

    pub fn weights(&self) -> &[f64; OBSERVATION_SIZE] {
        &self.0
    }

    /// The decision value for an observation.
    pub fn decide(&self, observation: &Observation) -> f64 {
        self.0
            .iter()
            .zip(observation.iter())
            .map(|(w, o)| w * o)
            .sum()
    }
}

impl TryFrom<&[f64]> for Strategy {
    type Error = SearchError;

    fn try_from(weights: &[f64]) -> Result<Self, Self::Error> {
        let weights: [f64; OBSERVATION_SIZE] =
            weights
                .try_into()
                .map_err(|_| SearchError::InvalidStrategyLength {
                    expected: OBSERVATION_SIZE,
                    got: weights.len(),
                })?;
        Ok(Self(weights))
    }
}

impl From<Strategy> for Vec<f64> {
    fn from(strategy: Strategy) -> Self {
        strategy.0.to_vec()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weights: Vec<String> = self.0.iter().map(|w| format!("{:.4}", w)).collect();
        write!(f, "[{}]", weights.join(", "))
    }
}
