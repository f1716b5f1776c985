use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Venue {0} not found")]
    VenueNotFound(String),

    #[error("Venue error: {0}")]
    Venue(String),

    #[error("Invalid symbol: {0}")]
    Symbol(String),

    #[error("Invalid strategy parameters: {0}")]
    StrategyParams(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
