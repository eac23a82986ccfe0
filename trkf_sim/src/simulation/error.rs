// trkf_sim/src/simulation/error.rs

use std::path::PathBuf;
use thiserror::Error;
use trkf_core::error::KalmanError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to load scenario {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to scan {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Kalman(#[from] KalmanError),
}

pub type SimResult<T> = Result<T, SimError>;
