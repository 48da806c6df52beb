//! Corpus and stopword loading for the binary and the HTTP layer.
//!
//! Supported corpus formats, picked by file extension:
//! - `.xml.gz`: gzipped Wikipedia abstract dump (`<feed><doc>...`)
//! - `.json`: array of strings or of `{ "text": ..., "title": ... }` objects
//! - `.jsonl`: one string or object per line
//! - anything else: plain text, documents separated by blank lines

use crate::corpus::Corpus;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use quick_xml::de::from_reader;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::info;

// Wikipedia abstract entry
#[derive(Debug, Deserialize)]
struct WikiDocument {
    #[serde(default)]
    title: String,
    #[serde(rename = "abstract", default)]
    text: String,
}

// Wrapper for XML deserialization
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "doc", default)]
    documents: Vec<WikiDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Text(String),
    Object {
        text: String,
        #[serde(default)]
        title: Option<String>,
    },
}

impl JsonDocument {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Object {
                text,
                title: Some(title),
            } => format!("{} {}", title, text),
            Self::Object { text, title: None } => text,
        }
    }
}

/// Load a corpus, choosing the format from the file name
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let file =
        File::open(path).with_context(|| format!("Failed to open corpus {}", path.display()))?;

    let parsed = if name.ends_with(".xml.gz") {
        read_wiki_abstracts(GzDecoder::new(file))
    } else if name.ends_with(".jsonl") {
        read_json_lines(file)
    } else if name.ends_with(".json") {
        read_json(file)
    } else {
        read_paragraphs(file)
    };
    let corpus = parsed.with_context(|| format!("Failed to parse corpus {}", path.display()))?;

    info!(path = %path.display(), documents = corpus.len(), "corpus loaded");
    Ok(corpus)
}

/// Title and abstract of every `<doc>` entry
pub fn read_wiki_abstracts<R: Read>(reader: R) -> Result<Corpus> {
    let feed: Feed = from_reader(BufReader::new(reader))?;
    Ok(feed
        .documents
        .into_iter()
        .map(|doc| format!("{} {}", doc.title, doc.text).trim().to_string())
        .collect())
}

pub fn read_json<R: Read>(reader: R) -> Result<Corpus> {
    let documents: Vec<JsonDocument> = serde_json::from_reader(BufReader::new(reader))?;
    Ok(documents.into_iter().map(JsonDocument::into_text).collect())
}

pub fn read_json_lines<R: Read>(reader: R) -> Result<Corpus> {
    let mut documents = Vec::new();
    for (number, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document: JsonDocument = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {}", number + 1))?;
        documents.push(document.into_text());
    }
    Ok(Corpus::new(documents))
}

/// Documents are runs of non-blank lines
pub fn read_paragraphs<R: Read>(reader: R) -> Result<Corpus> {
    let mut documents = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            if !current.is_empty() {
                documents.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        documents.push(current.join("\n"));
    }
    Ok(Corpus::new(documents))
}

/// One stopword per line; blank lines and `#` comments are skipped
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<BTreeSet<String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open stopword list {}", path.display()))?;
    read_stopwords(file)
}

pub fn read_stopwords<R: Read>(reader: R) -> Result<BTreeSet<String>> {
    let mut stopwords = BTreeSet::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let word = line.trim();
        if !word.is_empty() && !word.starts_with('#') {
            stopwords.insert(word.to_lowercase());
        }
    }
    Ok(stopwords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_read_paragraphs() -> Result<()> {
        let text = "first doc\nstill first\n\n\nsecond doc\n   \nthird";
        let corpus = read_paragraphs(text.as_bytes())?;
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.get(0), Some("first doc\nstill first"));
        assert_eq!(corpus.get(2), Some("third"));
        Ok(())
    }

    #[test]
    fn test_read_json_mixed_entries() -> Result<()> {
        let json = r#"["plain text", {"text": "body", "title": "Title"}, {"text": "untitled"}]"#;
        let corpus = read_json(json.as_bytes())?;
        assert_eq!(
            corpus.iter().collect::<Vec<_>>(),
            vec!["plain text", "Title body", "untitled"]
        );
        Ok(())
    }

    #[test]
    fn test_read_json_lines() -> Result<()> {
        let jsonl = "\"one\"\n\n{\"text\": \"two\"}\n";
        let corpus = read_json_lines(jsonl.as_bytes())?;
        assert_eq!(corpus.iter().collect::<Vec<_>>(), vec!["one", "two"]);

        assert!(read_json_lines("not json".as_bytes()).is_err());
        Ok(())
    }

    #[test]
    fn test_read_wiki_abstracts() -> Result<()> {
        let xml = r#"<feed>
            <doc><title>Wikipedia: Cat</title><url>https://en.wikipedia.org/wiki/Cat</url><abstract>The cat is a small carnivorous mammal.</abstract></doc>
            <doc><title>Wikipedia: Dog</title><abstract>The dog is a domesticated descendant of the wolf.</abstract></doc>
        </feed>"#;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xml.as_bytes())?;
        let compressed = encoder.finish()?;

        let corpus = read_wiki_abstracts(GzDecoder::new(compressed.as_slice()))?;
        assert_eq!(corpus.len(), 2);
        assert_eq!(
            corpus.get(0),
            Some("Wikipedia: Cat The cat is a small carnivorous mammal.")
        );
        Ok(())
    }

    #[test]
    fn test_read_stopwords() -> Result<()> {
        let list = "# english\nThe\n\n  and  \nthe\n";
        let stopwords = read_stopwords(list.as_bytes())?;
        assert_eq!(stopwords.into_iter().collect::<Vec<_>>(), vec!["and", "the"]);
        Ok(())
    }
}
