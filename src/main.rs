use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rslsa::api::create_router;
use rslsa::loader::{load_corpus, load_stopwords};
use rslsa::{BuildConfig, SearchEngine, SearchOptions, Tokenizer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Latent semantic search engine in Rust", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an index and run a single query
    Search {
        #[command(flatten)]
        index: IndexArgs,

        #[arg(short, long)]
        query: String,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },
    /// Build an index and serve it over HTTP
    Serve {
        #[command(flatten)]
        index: IndexArgs,

        #[arg(short, long, env = "RSLSA_ADDR", default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Corpus file (.json, .jsonl, .xml.gz, or blank-line separated text)
    #[arg(short, long, env = "RSLSA_CORPUS")]
    corpus: PathBuf,

    /// Stopword list, one word per line (defaults to built-in English list)
    #[arg(short, long)]
    stopwords: Option<PathBuf>,

    /// Latent dimensions
    #[arg(short, long, default_value_t = 100)]
    rank: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl IndexArgs {
    fn engine(&self) -> Result<SearchEngine> {
        let tokenizer = match &self.stopwords {
            Some(path) => Tokenizer::new(load_stopwords(path)?),
            None => Tokenizer::english(),
        };
        let config = BuildConfig::default()
            .with_rank(self.rank)
            .with_seed(self.seed);
        let corpus = load_corpus(&self.corpus)?;

        let start = Instant::now();
        let engine = SearchEngine::with_corpus(tokenizer, config, corpus)
            .context("Failed to build index")?;
        tracing::info!("Indexed corpus in {:?}", start.elapsed());
        Ok(engine)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RSLSA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_search(engine: &SearchEngine, query: &str, top_k: usize) -> Result<()> {
    let start = Instant::now();
    let hits = engine.search_documents(query, &SearchOptions { top_k })?;
    let duration = start.elapsed();

    println!("Search returned {} documents in {:?}", hits.len(), duration);
    println!();

    for hit in hits {
        let preview: String = hit.text.chars().take(120).collect();
        println!("{}\t{:.4}\t{}", hit.doc_index, hit.score, preview.replace('\n', " "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Search {
            index,
            query,
            top_k,
        } => {
            let engine = tokio::task::spawn_blocking(move || index.engine()).await??;
            run_search(&engine, &query, top_k)?;
        }
        Command::Serve { index, addr } => {
            let engine = tokio::task::spawn_blocking(move || index.engine()).await??;
            let router = create_router(Arc::new(engine));

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
