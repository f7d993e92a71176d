use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_yaml::from_reader;
use tracing::{debug, info, instrument, Level};

use crate::{
    env::cartpole::{CartPoleParams, CartPoleParamsBuilder},
    error::SearchError,
    logging::LogSettings,
    persistence::DEFAULT_STATE_FILE,
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AgentConfig {
    pub episodes: usize,
    #[serde(rename = "max-steps")]
    pub max_steps: usize,
    /// Score treated as a perfect episode.
    #[serde(rename = "max-score")]
    pub max_score: f64,
    #[serde(rename = "state-file")]
    pub state_file: PathBuf,
    #[serde(default = "default_render")]
    pub render: bool,
    #[serde(rename = "time-limit", default = "default_time_limit")]
    pub time_limit: usize,
    #[serde(rename = "log-dir")]
    pub log_dir: Option<String>,
    /// Console log level: trace, debug, info, warn or error.
    #[serde(rename = "log-level", default = "default_log_level")]
    pub log_level: String,
    pub seed: Option<u64>,
}

const DEFAULT_DATA: &str = r#"
episodes: 500
max-steps: 999
max-score: 500.0
state-file: "cartpole-v1.json"
render: true
time-limit: 500
log-dir: "logs"
log-level: "info"
"#;

fn default_time_limit() -> usize {
    500
}

fn default_render() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            episodes: 500,
            max_steps: 999,
            max_score: 500.0,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            render: default_render(),
            time_limit: default_time_limit(),
            log_dir: Some("logs".to_string()),
            log_level: default_log_level(),
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Reads the configuration from a YAML file.
    ///
    /// If the file does not exist, it creates a default configuration file.
    #[instrument(level = "info", skip(filename))]
    pub fn read_config<P: AsRef<Path>>(filename: Option<P>) -> Result<Self, SearchError> {
        let path = filename
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(|| Path::new("config.yml").to_path_buf());

        info!(path = %path.display(), "Reading configuration");

        if !path.exists() {
            info!(
                "Config file does not exist. Creating default config at {}",
                path.display()
            );
            let mut file = File::create(&path)?;
            file.write_all(DEFAULT_DATA.as_bytes())?;
            debug!("Default configuration file created");
            return Ok(AgentConfig::default());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let config: Self = from_reader(reader)?;
        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.episodes == 0 {
            return Err(SearchError::InvalidSetting(
                "episodes must be at least 1".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(SearchError::InvalidSetting(
                "max-steps must be at least 1".to_string(),
            ));
        }
        if self.time_limit == 0 {
            return Err(SearchError::InvalidSetting(
                "time-limit must be at least 1".to_string(),
            ));
        }
        if !self.max_score.is_finite() {
            return Err(SearchError::InvalidSetting(format!(
                "max-score must be finite, got {}",
                self.max_score
            )));
        }
        self.log_settings()?;
        Ok(())
    }

    /// Logging for this run. The file keeps render frames (TRACE) only when
    /// rendering is on.
    pub fn log_settings(&self) -> Result<LogSettings, SearchError> {
        let console = self.log_level.parse::<Level>().map_err(|_| {
            SearchError::InvalidSetting(format!(
                "log-level must be one of trace, debug, info, warn, error, got {:?}",
                self.log_level
            ))
        })?;
        let file = if self.render { Level::TRACE } else { Level::DEBUG };
        Ok(LogSettings {
            dir: self.log_dir.as_ref().map(PathBuf::from),
            console,
            file,
        })
    }

    /// Cart-pole physics for this run.
    pub fn cartpole_params(&self) -> Result<CartPoleParams, SearchError> {
        Ok(CartPoleParamsBuilder::default()
            .time_limit(self.time_limit)
            .build()?)
    }
}
