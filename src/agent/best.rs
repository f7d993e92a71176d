use crate::agent::strategy::Strategy;

/// The best strategy found so far and the score it reached.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestRecord {
    high_score: f64,
    best_strategy: Option<Strategy>,
}

impl BestRecord {
    pub fn new(high_score: f64, best_strategy: Option<Strategy>) -> Self {
        Self {
            high_score,
            best_strategy,
        }
    }

    pub fn high_score(&self) -> f64 {
        self.high_score
    }

    pub fn best_strategy(&self) -> Option<Strategy> {
        self.best_strategy
    }

    /// Keeps `strategy` if it beat the high score or reached `max_score`.
    /// A perfect score always replaces the record, even when tied.
    pub fn consider(&mut self, score: f64, strategy: Strategy, max_score: f64) -> bool {
        if score > self.high_score || score == max_score {
            self.high_score = score;
            self.best_strategy = Some(strategy);
            true
        } else {
            false
        }
    }
}
