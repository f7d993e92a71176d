use std::path::PathBuf;

use clap::Parser;

/// Random search for a cart-pole balancing strategy.
///
/// With no flags, trains for the configured number of episodes and offers to
/// save the best strategy found.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about)]
pub struct Args {
    /// Path to the YAML run settings; created with defaults if missing
    #[arg(short, long, default_value = "config.yml", env = "CARTPOLE_CONFIG")]
    pub config: PathBuf,
    /// Number of episodes, overriding the settings file
    #[arg(short, long)]
    pub episodes: Option<usize>,
    /// Replay the saved best strategy instead of training
    #[arg(long)]
    pub evaluate: bool,
    /// Seed for strategy sampling and environment resets
    #[arg(short, long)]
    pub seed: Option<u64>,
    /// Save without asking, even if the high score did not improve
    #[arg(short, long)]
    pub yes: bool,
    /// Write per-episode results to this CSV file
    #[arg(long)]
    pub history: Option<PathBuf>,
}
