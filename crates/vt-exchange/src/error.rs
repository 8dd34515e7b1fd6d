use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("a tuple is already posted under key {key}")]
    KeyOccupied { key: String },

    #[error("a blocked poster is already pending under key {key}")]
    PosterStillBlocked { key: String },

    #[error("blocking exchange calls require a detachable event context")]
    NotDetachable,
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
