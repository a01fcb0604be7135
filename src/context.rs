//! Extra material placed in front of the model: files matched by `--glob`
//! and snippets found by a [`Retriever`].

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Characters per retrieval chunk.
const CHUNK_CHARS: usize = 1000;

/// Characters shared by consecutive chunks.
const CHUNK_OVERLAP: usize = 200;

/// A piece of text and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub source: String,
    pub text: String,
}

/// Finds snippets relevant to a query.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Returns at most `k` snippets, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Snippet>>;
}

/// Rewrites a prompt so the model answers from the given snippets.
pub fn augment_prompt(prompt: &str, snippets: &[Snippet]) -> String {
    let mut out = String::from("Use the following context to answer the user's question:\n\n");
    for snippet in snippets {
        out.push_str(&format!(
            "--- Source: {} ---\n{}\n\n",
            snippet.source, snippet.text
        ));
    }
    out.push_str("User Question: ");
    out.push_str(prompt);
    out
}

/// Prefixes a query with context that is not kept in history.
pub fn with_context(context: &str, query: &str) -> String {
    format!("CONTEXT:\n{context}\n\nUSER QUERY:\n{query}")
}

/// Expands glob patterns into a sorted, de-duplicated list of files.
fn find_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        let paths =
            glob::glob(pattern).with_context(|| format!("invalid glob pattern '{pattern}'"))?;
        for path in paths.flatten() {
            if path.is_file() && seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn read_text(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable file");
            None
        }
    }
}

/// Reads every text file matched by `patterns` into one context block.
///
/// Each file is introduced by a `--- File: <path> ---` line. Binary or
/// unreadable files are skipped.
pub fn load_context_files(patterns: &[String]) -> Result<String> {
    let mut out = String::new();
    for path in find_files(patterns)? {
        if let Some(text) = read_text(&path) {
            debug!(path = %path.display(), bytes = text.len(), "loaded context file");
            out.push_str(&format!("--- File: {} ---\n{}\n\n", path.display(), text));
        }
    }
    Ok(out.trim_end().to_string())
}

/// In-memory lexical retriever over local documents.
///
/// Documents are split into overlapping chunks; a chunk scores one point
/// per distinct query term it contains.
pub struct KeywordRetriever {
    chunks: Vec<Snippet>,
}

impl KeywordRetriever {
    pub fn from_patterns(patterns: &[String]) -> Result<Self> {
        let mut chunks = Vec::new();
        for path in find_files(patterns)? {
            let Some(text) = read_text(&path) else {
                continue;
            };
            let source = path.display().to_string();
            chunks.extend(chunk_text(&clean_text(&text)).into_iter().map(|text| Snippet {
                source: source.clone(),
                text,
            }));
        }
        Ok(Self { chunks })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait::async_trait]
impl Retriever for KeywordRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        let terms = terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let mut scored: Vec<(usize, &Snippet)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let haystack = chunk.text.to_lowercase();
                let score = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        // stable: equal scores keep document order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, s)| s.clone()).collect())
    }
}

fn terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn chunk_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + CHUNK_CHARS).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += CHUNK_CHARS - CHUNK_OVERLAP;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ai_test_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn context_files_are_framed_by_path() {
        let dir = temp_dir("context");
        std::fs::write(dir.join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.join("b.txt"), "beta").unwrap();
        std::fs::write(dir.join("c.md"), "ignored").unwrap();

        let pattern = format!("{}/*.txt", dir.display());
        let text = load_context_files(&[pattern.clone(), pattern]).unwrap();
        assert_eq!(
            text,
            format!(
                "--- File: {0}/a.txt ---\nalpha\n\n--- File: {0}/b.txt ---\nbeta",
                dir.display()
            )
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(load_context_files(&["[".to_string()]).is_err());
    }

    #[test]
    fn with_context_layout() {
        assert_eq!(
            with_context("facts", "question"),
            "CONTEXT:\nfacts\n\nUSER QUERY:\nquestion"
        );
    }

    #[test]
    fn chunks_overlap_and_cover_everything() {
        let text: String = "x".repeat(2500);
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[2].len(), 2500 - 1600);
        assert!(chunk_text("").is_empty());
    }

    #[tokio::test]
    async fn keyword_search_ranks_by_matching_terms() {
        let dir = temp_dir("rag");
        std::fs::write(dir.join("rust.md"), "Rust ownership and borrowing rules").unwrap();
        std::fs::write(dir.join("go.md"), "Go has garbage collection").unwrap();
        std::fs::write(dir.join("both.md"), "Rust has no garbage collection, only ownership").unwrap();

        let retriever =
            KeywordRetriever::from_patterns(&[format!("{}/*.md", dir.display())]).unwrap();
        assert_eq!(retriever.len(), 3);

        let hits = retriever.search("ownership garbage", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].source.ends_with("both.md"));

        assert!(retriever.search("python", 3).await.unwrap().is_empty());
        assert!(retriever.search("a b", 3).await.unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
