pub mod best;
pub mod decision;
pub mod report;
pub mod search;
pub mod strategy;

pub use search::StrategySearchAgent;
