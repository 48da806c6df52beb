use rslsa::{BuildConfig, Corpus, Index, SearchEngine, SearchOptions, Tokenizer};

fn main() -> anyhow::Result<()> {
    println!("=== RSLSA Basic Usage Example ===\n");

    let corpus = Corpus::new(vec![
        "Rust is a systems programming language that runs blazingly fast, prevents segfaults, and guarantees thread safety.".to_string(),
        "Go is an open source programming language that makes it easy to build simple, reliable, and efficient software.".to_string(),
        "Python is a programming language that lets you work quickly and integrate systems more effectively.".to_string(),
        "The domestic cat is a small carnivorous mammal, often kept as a house pet.".to_string(),
        "Dogs were the first species to be domesticated and are popular household pets.".to_string(),
    ]);

    // Build the index (the corpus is small, so keep the rank small too)
    println!("Building index...");
    let engine = SearchEngine::with_corpus(
        Tokenizer::english(),
        BuildConfig::default().with_rank(3),
        corpus,
    )?;
    let stats = engine.stats()?;
    println!(
        "✓ Indexed {} documents, {} terms, rank {} ({:.1}% of variance)\n",
        stats.total_documents,
        stats.total_terms,
        stats.rank,
        stats.explained_variance_ratio * 100.0
    );

    // Example 1: Semantic search
    println!("--- Example 1: Search for 'programming language' ---");
    let hits = engine.search_documents("programming language", &SearchOptions::default())?;
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [Score: {:.4}] #{} {}", i + 1, hit.score, hit.doc_index, hit.text);
    }

    // Example 2: Fewer results
    println!("\n--- Example 2: Top 2 for 'household pet' ---");
    let options = SearchOptions { top_k: 2 };
    for hit in engine.search_documents("household pet", &options)? {
        println!("  [{:.4}] #{}", hit.score, hit.doc_index);
    }

    // Example 3: Unknown terms are not an error
    println!("\n--- Example 3: Query with no known terms ---");
    let results = engine.search("xyzzy unknownterm", &options)?;
    println!("Scores: {:?}", results.iter().map(|r| r.score).collect::<Vec<_>>());

    // Example 4: Rebuild with a different rank while the old index stays usable
    println!("\n--- Example 4: Rebuild ---");
    let old = engine.index()?;
    let new = engine.rebuild(BuildConfig::default().with_rank(2))?;
    println!("Old rank {}, new rank {}", old.rank(), new.rank());

    // Example 5: Snapshot round trip
    println!("\n--- Example 5: Snapshot ---");
    let bytes = new.to_bytes()?;
    let restored = Index::from_bytes(&bytes)?;
    println!(
        "Snapshot is {} bytes, identical results: {}",
        bytes.len(),
        restored.search("cat", 3)? == new.search("cat", 3)?
    );

    println!("\n=== Example Complete ===");

    Ok(())
}
