pub mod agent;
pub mod args;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod util;
