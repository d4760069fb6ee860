pub mod flow;
pub mod reconcile;
pub mod transform;
pub mod upstream;

use http::StatusCode;
use thiserror::Error;

pub use reconcile::{ReconcileError, ReconcileOutcome};
pub use upstream::{Upstream, UpstreamError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Domain(#[from] domain::Error),
}

impl Error {
    pub fn to_status(&self) -> StatusCode {
        match self {
            Error::Domain(domain::Error::UnsupportedBlock(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable detail for the relay's error envelope.
    pub fn details(&self) -> String {
        match self {
            Error::Upstream(e) => e.details(),
            Error::Reconcile(ReconcileError::Append { source, .. }) => source.details(),
            Error::Domain(e) => e.to_string(),
        }
    }
}
