use std::{fmt, path::Path};

use tracing::info;

use crate::{
    agent::{decision::DecisionSpectrum, strategy::Strategy},
    error::SearchError,
};

/// State of the search after a single episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub train: bool,
    pub score: f64,
    pub steps: usize,
    pub high_score: f64,
    pub spectrum: DecisionSpectrum,
    pub threshold: f64,
    /// This episode replaced the best record.
    pub improved: bool,
}

impl fmt::Display for EpisodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Episode {} ({}): Score: {} in {} steps | HighScore: {} | DecSpec: {} | Threshold: {}",
            self.episode,
            if self.train { "train" } else { "eval" },
            self.score,
            self.steps,
            self.high_score,
            self.spectrum,
            self.threshold
        )
    }
}

/// Overall result of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub episodes: usize,
    pub high_score: f64,
    pub best_strategy: Option<Strategy>,
    pub spectrum: DecisionSpectrum,
    pub threshold: f64,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = self
            .best_strategy
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "Episodes: {} | HighScore: {} | Strategy: {} | DecisionSpec: {} | Threshold: {}",
            self.episodes, self.high_score, strategy, self.spectrum, self.threshold
        )
    }
}

/// Writes episode summaries to a CSV file, one row per episode.
pub fn write_history<P: AsRef<Path>>(
    path: P,
    history: &[EpisodeSummary],
) -> Result<(), SearchError> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record([
        "episode",
        "train",
        "score",
        "steps",
        "high_score",
        "spectrum_min",
        "spectrum_max",
        "threshold",
        "improved",
    ])?;
    for summary in history {
        writer.write_record(&[
            summary.episode.to_string(),
            summary.train.to_string(),
            summary.score.to_string(),
            summary.steps.to_string(),
            summary.high_score.to_string(),
            summary.spectrum.min.to_string(),
            summary.spectrum.max.to_string(),
            summary.threshold.to_string(),
            summary.improved.to_string(),
        ])?;
    }
    writer.flush()?;
    info!(
        path = %path.as_ref().display(),
        rows = history.len(),
        "Wrote episode history"
    );
    Ok(())
}
