pub mod notion;

pub use notion::NotionClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid upstream settings: {0}")]
    Settings(String),
}
