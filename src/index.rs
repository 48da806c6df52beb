use crate::error::{Result, SearchError};
use crate::matrix::DenseMatrix;
use crate::projector::QueryProjector;
use crate::ranking::{l2_norm, rank_top_k, ScoredDocument};
use crate::svd::{LatentModel, TruncatedSvd};
use crate::tfidf::{idf_vector, tfidf_matrix};
use crate::tokenizer::Tokenizer;
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Snapshot header: magic bytes followed by a format version
const SNAPSHOT_MAGIC: &[u8; 4] = b"RLSA";
const SNAPSHOT_VERSION: u8 = 1;

/// Index build parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Latent dimensions kept by the decomposition
    pub rank: usize,
    /// Seed for the randomized range finder
    pub seed: u64,
    pub oversampling: usize,
    pub power_iterations: usize,
    pub max_sweeps: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            rank: 100,
            seed: 42,
            oversampling: 10,
            power_iterations: 5,
            max_sweeps: 64,
        }
    }
}

impl BuildConfig {
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_power_iterations(mut self, power_iterations: usize) -> Self {
        self.power_iterations = power_iterations;
        self
    }

    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    fn svd(&self) -> TruncatedSvd {
        TruncatedSvd {
            rank: self.rank,
            seed: self.seed,
            oversampling: self.oversampling,
            power_iterations: self.power_iterations,
            max_sweeps: self.max_sweeps,
        }
    }
}

/// Builds an [`Index`] from a raw corpus in one batch
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    tokenizer: Tokenizer,
    config: BuildConfig,
}

impl IndexBuilder {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            config: BuildConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Vocabulary, TF-IDF, then truncated SVD.
    ///
    /// Fails with `EmptyVocabulary`, `RankTooLarge` or `NumericInstability`.
    #[instrument(skip_all, fields(documents = documents.len(), rank = self.config.rank))]
    pub fn build<S: AsRef<str>>(&self, documents: &[S]) -> Result<Index> {
        let start = Instant::now();

        let (vocabulary, tokenized) = Vocabulary::build(documents, &self.tokenizer)?;
        let idf = idf_vector(&vocabulary);
        let matrix = tfidf_matrix(&tokenized, &vocabulary, &idf);

        let zero_rows = matrix.zero_rows();
        if zero_rows > 0 {
            warn!(zero_rows, "documents without any vocabulary term");
        }

        let model = self.config.svd().fit(&matrix)?;

        let total_energy = matrix.frobenius_norm_sq();
        let retained: f64 = model.singular_values.iter().map(|s| s * s).sum();
        let stats = IndexStats {
            total_documents: matrix.rows(),
            total_terms: matrix.cols(),
            rank: model.rank(),
            nonzeros: matrix.nnz(),
            empty_documents: zero_rows,
            explained_variance_ratio: if total_energy > 0.0 {
                (retained / total_energy).min(1.0)
            } else {
                0.0
            },
        };

        info!(
            documents = stats.total_documents,
            terms = stats.total_terms,
            rank = stats.rank,
            explained = stats.explained_variance_ratio,
            elapsed = ?start.elapsed(),
            "index built"
        );

        Ok(Index::from_parts(
            self.tokenizer.clone(),
            vocabulary,
            idf,
            model,
            stats,
        ))
    }
}

/// Index statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_terms: usize,
    pub rank: usize,
    /// Stored entries in the TF-IDF matrix
    pub nonzeros: usize,
    /// Documents that contain no vocabulary term
    pub empty_documents: usize,
    /// Share of the TF-IDF matrix energy kept by the latent space
    pub explained_variance_ratio: f64,
}

/// Immutable search index: vocabulary, IDF weights, latent factors and the
/// latent document matrix.
///
/// Safe to share across threads; every query allocates its own buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IndexParts")]
pub struct Index {
    tokenizer: Tokenizer,
    vocabulary: Vocabulary,
    idf: Vec<f64>,
    model: LatentModel,
    stats: IndexStats,
    #[serde(skip)]
    document_norms: Vec<f64>,
}

/// Deserialized form; shapes are checked before document norms are computed
#[derive(Deserialize)]
struct IndexParts {
    tokenizer: Tokenizer,
    vocabulary: Vocabulary,
    idf: Vec<f64>,
    model: LatentModel,
    stats: IndexStats,
}

impl IndexParts {
    fn check_shapes(&self) -> std::result::Result<(), String> {
        let terms = self.vocabulary.len();
        let rank = self.model.singular_values.len();
        let documents = self.stats.total_documents;

        let checks = [
            (self.vocabulary.document_frequencies().len() == terms, "document frequencies"),
            (self.idf.len() == terms, "idf weights"),
            (self.model.components.rows() == terms, "latent factor rows"),
            (self.model.components.cols() == rank, "latent factor columns"),
            (self.model.document_vectors.rows() == documents, "document vector rows"),
            (self.model.document_vectors.cols() == rank, "document vector columns"),
            (self.stats.total_terms == terms, "term count"),
            (self.stats.rank == rank, "rank"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, what)) => Err(format!("inconsistent {}", what)),
            None => Ok(()),
        }
    }
}

impl TryFrom<IndexParts> for Index {
    type Error = String;

    fn try_from(parts: IndexParts) -> std::result::Result<Self, Self::Error> {
        parts.check_shapes()?;
        Ok(Self::from_parts(
            parts.tokenizer,
            parts.vocabulary,
            parts.idf,
            parts.model,
            parts.stats,
        ))
    }
}

impl Index {
    fn from_parts(
        tokenizer: Tokenizer,
        vocabulary: Vocabulary,
        idf: Vec<f64>,
        model: LatentModel,
        stats: IndexStats,
    ) -> Self {
        let document_norms = (0..model.document_vectors.rows())
            .map(|i| l2_norm(model.document_vectors.row(i)))
            .collect();
        Self {
            tokenizer,
            vocabulary,
            idf,
            model,
            stats,
            document_norms,
        }
    }

    pub fn num_documents(&self) -> usize {
        self.model.document_vectors.rows()
    }

    pub fn rank(&self) -> usize {
        self.model.rank()
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Latent factors `V`, terms × k
    pub fn latent_factors(&self) -> &DenseMatrix {
        &self.model.components
    }

    /// Latent document matrix, documents × k
    pub fn document_vectors(&self) -> &DenseMatrix {
        &self.model.document_vectors
    }

    pub fn singular_values(&self) -> &[f64] {
        &self.model.singular_values
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn projector(&self) -> QueryProjector<'_> {
        QueryProjector::new(
            &self.tokenizer,
            &self.vocabulary,
            &self.idf,
            &self.model.components,
        )
    }

    /// Latent vector of a query
    pub fn project(&self, query: &str) -> Result<Vec<f64>> {
        self.projector().project(query)
    }

    /// Top `top_k` documents for `query`, best first
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        if top_k == 0 {
            return Err(SearchError::InvalidK(top_k));
        }
        let latent = self.project(query)?;
        rank_top_k(
            &latent,
            &self.model.document_vectors,
            &self.document_norms,
            top_k,
        )
    }

    /// Serialize to the snapshot format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(SNAPSHOT_MAGIC);
        bytes.push(SNAPSHOT_VERSION);
        bincode::serialize_into(&mut bytes, self)?;
        Ok(bytes)
    }

    /// Restore an index written by [`Index::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = SNAPSHOT_MAGIC.len() + 1;
        if bytes.len() < header || &bytes[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
            return Err(SearchError::Snapshot("missing snapshot header".to_string()));
        }
        let version = bytes[SNAPSHOT_MAGIC.len()];
        if version != SNAPSHOT_VERSION {
            return Err(SearchError::Snapshot(format!(
                "unsupported snapshot version {}",
                version
            )));
        }

        Ok(bincode::deserialize(&bytes[header..])?)
    }
}
