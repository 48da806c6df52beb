//! Error taxonomy for index construction and querying.
//!
//! Every variant is recoverable: build errors abort the build in progress and
//! leave any previously ready index untouched, query errors are per request.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// No usable terms remain after tokenization and stopword filtering
    #[error("corpus has no usable terms after stopword filtering")]
    EmptyVocabulary,
    /// Requested rank exceeds min(documents, terms), or is zero
    #[error("rank {rank} is out of bounds (must be between 1 and {max})")]
    RankTooLarge { rank: usize, max: usize },
    /// Decomposition did not converge or produced non-finite values
    #[error("decomposition failed: {0}")]
    NumericInstability(String),
    /// No ready index is available to serve queries
    #[error("index is not ready")]
    IndexNotReady,
    /// Query text is empty or whitespace only
    #[error("query is empty")]
    EmptyQuery,
    /// Result count must be at least 1
    #[error("invalid result count {0}, must be at least 1")]
    InvalidK(usize),
    /// Serialized index could not be encoded or decoded
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

impl From<bincode::Error> for SearchError {
    fn from(err: bincode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}
