use crate::env::cartpole::CartPoleParamsBuilderError;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serde JSON Error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Serde YAML Error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error),
    #[error("CSV Error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Failed to build cart-pole parameters: {0}")]
    ParamsError(#[from] CartPoleParamsBuilderError),
    #[error("No best strategy is available; train or load a state file first.")]
    NoBestStrategy,
    #[error("A strategy needs exactly {expected} weights, got {got}.")]
    InvalidStrategyLength { expected: usize, got: usize },
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}
