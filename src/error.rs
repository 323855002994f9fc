use thiserror::Error;

use crate::db::StoreError;
use crate::generation::GenerationError;

/// Everything a pipeline operation can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
