pub mod cli;
pub mod router;
pub mod settings;
pub mod state;

mod error;

pub use error::{ApiError, Error};
