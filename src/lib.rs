// Re-export main components
pub mod api;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod matrix;
pub mod projector;
pub mod ranking;
pub mod svd;
pub mod tfidf;
pub mod tokenizer;
pub mod vocabulary;

// Re-export commonly used types
pub use corpus::Corpus;
pub use engine::{IndexStatus, SearchEngine, SearchHit, SearchOptions};
pub use error::{Result, SearchError};
pub use index::{BuildConfig, Index, IndexBuilder, IndexStats};
pub use projector::QueryProjector;
pub use ranking::ScoredDocument;
pub use tokenizer::Tokenizer;
pub use vocabulary::Vocabulary;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
