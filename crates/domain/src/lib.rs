pub mod block;
pub mod page;
pub mod setting;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported block type: {0}")]
    UnsupportedBlock(String),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
