use thiserror::Error;

use crate::trainer_utils::Action;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("bad card string '{0}'")]
    InvalidCard(String),

    #[error("expected two hole cards, got {0}")]
    HoleCards(usize),

    #[error("seat {seat} cannot {action} here")]
    IllegalAction { seat: usize, action: Action },

    #[error("no legal actions to sample from")]
    NoLegalActions,

    #[error("cannot draw {requested} cards, only {available} left in the deck")]
    NotEnoughCards { requested: usize, available: usize },

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse TOML config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub fn io(path: &str, source: std::io::Error) -> SolverError {
        SolverError::Io {
            path: path.to_string(),
            source,
        }
    }
}
