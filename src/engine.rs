use crate::corpus::Corpus;
use crate::error::{Result, SearchError};
use crate::index::{BuildConfig, Index, IndexBuilder, IndexStats};
use crate::ranking::ScoredDocument;
use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{info, instrument, warn};

/// Search options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of results to return
    pub top_k: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Search hit resolved against the corpus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_index: usize,
    pub score: f64,
    pub text: String,
}

/// Lifecycle of the engine's index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Uninitialized,
    Building,
    Ready,
    Rebuilding,
}

/// A ready index together with the corpus it was built from
#[derive(Debug, Clone)]
struct Generation {
    index: Arc<Index>,
    corpus: Corpus,
    config: BuildConfig,
}

#[derive(Debug, Clone)]
enum IndexState {
    Uninitialized,
    Building,
    Ready(Generation),
    /// A replacement is being built; the previous generation keeps serving
    Rebuilding(Generation),
}

impl IndexState {
    fn status(&self) -> IndexStatus {
        match self {
            Self::Uninitialized => IndexStatus::Uninitialized,
            Self::Building => IndexStatus::Building,
            Self::Ready(_) => IndexStatus::Ready,
            Self::Rebuilding(_) => IndexStatus::Rebuilding,
        }
    }

    fn serving(&self) -> Option<&Generation> {
        match self {
            Self::Ready(generation) | Self::Rebuilding(generation) => Some(generation),
            Self::Uninitialized | Self::Building => None,
        }
    }
}

/// Owns the current index and swaps in rebuilt ones atomically.
///
/// Queries take the state lock only long enough to clone an `Arc<Index>`;
/// builds run without holding it, so a rebuild never blocks readers of the
/// previous index. Builds are serialized among themselves.
pub struct SearchEngine {
    tokenizer: Tokenizer,
    state: RwLock<IndexState>,
    build_lock: Mutex<BuildConfig>,
}

impl SearchEngine {
    /// Create an engine without an index
    pub fn new(tokenizer: Tokenizer, config: BuildConfig) -> Self {
        Self {
            tokenizer,
            state: RwLock::new(IndexState::Uninitialized),
            build_lock: Mutex::new(config),
        }
    }

    /// Create an engine and build its first index
    pub fn with_corpus(tokenizer: Tokenizer, config: BuildConfig, corpus: Corpus) -> Result<Self> {
        let engine = Self::new(tokenizer, config);
        engine.build(corpus)?;
        Ok(engine)
    }

    pub fn status(&self) -> IndexStatus {
        self.read_state().status()
    }

    /// Build config used by the next `build` call
    pub fn config(&self) -> BuildConfig {
        *self.build_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index a corpus with the current config and make it the serving index
    pub fn build(&self, corpus: Corpus) -> Result<Arc<Index>> {
        let mut current = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let config = *current;
        self.build_locked(corpus, config, &mut current)
    }

    /// Rebuild the serving corpus with a new config.
    ///
    /// Fails with `IndexNotReady` when there is no corpus yet.
    pub fn rebuild(&self, config: BuildConfig) -> Result<Arc<Index>> {
        let mut current = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let corpus = self
            .read_state()
            .serving()
            .map(|generation| generation.corpus.clone())
            .ok_or(SearchError::IndexNotReady)?;
        self.build_locked(corpus, config, &mut current)
    }

    #[instrument(skip_all, fields(documents = corpus.len(), rank = config.rank))]
    fn build_locked(
        &self,
        corpus: Corpus,
        config: BuildConfig,
        current: &mut BuildConfig,
    ) -> Result<Arc<Index>> {
        let previous = {
            let mut state = self.write_state();
            let previous = state.serving().cloned();
            *state = match &previous {
                Some(generation) => IndexState::Rebuilding(generation.clone()),
                None => IndexState::Building,
            };
            previous
        };

        let builder = IndexBuilder::new(self.tokenizer.clone()).with_config(config);
        match builder.build(corpus.documents()) {
            Ok(index) => {
                let index = Arc::new(index);
                *self.write_state() = IndexState::Ready(Generation {
                    index: Arc::clone(&index),
                    corpus,
                    config,
                });
                *current = config;
                info!(status = ?IndexStatus::Ready, "index swapped in");
                Ok(index)
            }
            Err(err) => {
                warn!(error = %err, "index build failed, keeping previous state");
                *self.write_state() = match previous {
                    Some(generation) => IndexState::Ready(generation),
                    None => IndexState::Uninitialized,
                };
                Err(err)
            }
        }
    }

    /// Serving index, or `IndexNotReady`
    pub fn index(&self) -> Result<Arc<Index>> {
        self.read_state()
            .serving()
            .map(|generation| Arc::clone(&generation.index))
            .ok_or(SearchError::IndexNotReady)
    }

    /// Corpus of the serving index
    pub fn corpus(&self) -> Result<Corpus> {
        self.read_state()
            .serving()
            .map(|generation| generation.corpus.clone())
            .ok_or(SearchError::IndexNotReady)
    }

    /// Config the serving index was built with
    pub fn serving_config(&self) -> Result<BuildConfig> {
        self.read_state()
            .serving()
            .map(|generation| generation.config)
            .ok_or(SearchError::IndexNotReady)
    }

    /// Rank documents against the serving index
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<ScoredDocument>> {
        let index = self.index()?;
        index.search(query, options.top_k)
    }

    /// Search and resolve each hit to its document text.
    ///
    /// Index and corpus come from the same generation even if a rebuild
    /// lands mid-query.
    pub fn search_documents(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let generation = self
            .read_state()
            .serving()
            .cloned()
            .ok_or(SearchError::IndexNotReady)?;
        let results = generation.index.search(query, options.top_k)?;
        Ok(results
            .into_iter()
            .map(|r| SearchHit {
                doc_index: r.doc_index,
                score: r.score,
                text: generation.corpus.get(r.doc_index).unwrap_or_default().to_string(),
            })
            .collect())
    }

    /// Document text by index
    pub fn get_document(&self, doc_index: usize) -> Result<Option<String>> {
        Ok(self.corpus()?.get(doc_index).map(str::to_string))
    }

    /// Get index statistics
    pub fn stats(&self) -> Result<IndexStats> {
        Ok(self.index()?.stats())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
