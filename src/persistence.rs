use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{agent::decision::DecisionSpectrum, error::SearchError};

pub const DEFAULT_STATE_FILE: &str = "cartpole-v1.json";

/// Snapshot of the search state kept between runs.
///
/// Every key is optional on disk; missing ones fall back to zero or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfig {
    #[serde(default)]
    pub decision_threshold: f64,
    #[serde(default)]
    pub decision_spectrum: DecisionSpectrum,
    #[serde(default)]
    pub high_score: f64,
    #[serde(default)]
    pub best_strategy: Vec<f64>,
}

/// JSON file holding a [`PersistedConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored state. Returns `Ok(None)` when the file does not exist.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Option<PersistedConfig>, SearchError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let file = File::open(&self.path)?;
        let config: PersistedConfig = serde_json::from_reader(BufReader::new(file))?;
        debug!(?config, "Read persisted state");
        Ok(Some(config))
    }

    pub fn save(&self, config: &PersistedConfig) -> Result<(), SearchError> {
        let json = serde_json::to_string_pretty(config)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Decides whether a save that does not beat the stored high score goes ahead.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Asks on stdin; only `y` counts as yes.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl StdinConfirm {
    fn ask<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
        write!(output, "{} ", prompt)?;
        output.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        Ok(answer.trim() == "y")
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        let stdin = io::stdin();
        match Self::ask(prompt, &mut stdin.lock(), &mut io::stdout()) {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

/// Gives the same answer every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        info!(answer = self.0, "{}", prompt);
        self.0
    }
}
