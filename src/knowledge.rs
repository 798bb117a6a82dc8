//! Authentication-guide retrieval.
//!
//! `GuideLibrary` keeps markdown guides in memory as overlapping chunks and
//! ranks them by how many distinct query terms each chunk contains. Output is
//! the concatenated top-k excerpts with source labels, or a fixed sentinel
//! when nothing matches.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

pub const NOTHING_FOUND: &str = "nothing found in the knowledge base for that query";
pub const DEFAULT_TOP_K: usize = 3;
pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;

pub trait KnowledgeBase: Send + Sync {
    fn search(&self, query: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct GuideLibrary {
    chunks: Vec<Chunk>,
    top_k: usize,
}

impl GuideLibrary {
    pub fn new(top_k: usize) -> Self {
        Self {
            chunks: Vec::new(),
            top_k: top_k.max(1),
        }
    }

    /// Load every `*.md` file in `dir` (sorted by name). A missing directory is an error.
    pub fn from_dir(dir: &Path, top_k: usize) -> Result<Self> {
        let mut lib = Self::new(top_k);
        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("reading knowledge base dir {}", dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
            .collect();
        paths.sort();

        for p in paths {
            let text = fs::read_to_string(&p)
                .with_context(|| format!("reading guide {}", p.display()))?;
            let source = p
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();
            lib.add_document(&source, &text);
        }
        info!(chunks = lib.len(), dir = %dir.display(), "knowledge base loaded");
        Ok(lib)
    }

    pub fn add_document(&mut self, source: &str, text: &str) {
        for piece in split_chunks(text, CHUNK_SIZE, CHUNK_OVERLAP) {
            self.chunks.push(Chunk {
                source: source.to_string(),
                text: piece,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-k chunks by distinct query-term hits; ties keep document order.
    pub fn top_matches(&self, query: &str) -> Vec<&Chunk> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(usize, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let lower = c.text.to_lowercase();
                let hits = terms.iter().filter(|t| lower.contains(t.as_str())).count();
                (hits > 0).then_some((hits, i))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, i)| &self.chunks[i])
            .collect()
    }
}

impl KnowledgeBase for GuideLibrary {
    fn search(&self, query: &str) -> String {
        let hits = self.top_matches(query);
        if hits.is_empty() {
            return NOTHING_FOUND.to_string();
        }
        let mut out = String::new();
        for c in hits {
            out.push_str(&format!("\n--- Source: {} ---\n", c.source));
            out.push_str(&c.text);
            out.push('\n');
        }
        out
    }
}

/// Lowercased alphanumeric terms of 3+ chars, deduplicated.
fn query_terms(query: &str) -> BTreeSet<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fixed-size character windows with overlap. Window ends prefer the last
/// whitespace inside the window so words stay whole.
pub fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let size = size.max(1);
    let overlap = overlap.min(size - 1);
    let mut out = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = (start + size).min(chars.len());
        if end < chars.len() {
            if let Some(ws) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if ws > overlap {
                    end = start + ws;
                }
            }
        }
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib() -> GuideLibrary {
        let mut l = GuideLibrary::new(DEFAULT_TOP_K);
        l.add_document(
            "margiela_authentication.md",
            "GAT heel tab: authentic tabs are thin and flat. Fakes have a puffy heel.",
        );
        l.add_document(
            "general_authentication.md",
            "Check stitching, fonts and hardware on every designer item.",
        );
        l
    }

    #[test]
    fn search_formats_sources() {
        let out = lib().search("margiela GAT heel tab");
        assert!(out.starts_with("\n--- Source: margiela_authentication.md ---\n"));
        assert!(out.contains("puffy heel"));
        assert!(!out.contains("general_authentication.md"));
    }

    #[test]
    fn no_match_returns_sentinel() {
        assert_eq!(lib().search("watch bezel"), NOTHING_FOUND);
        assert_eq!(GuideLibrary::new(3).search("anything"), NOTHING_FOUND);
    }

    #[test]
    fn chunks_overlap_and_cover_text() {
        let text = "word ".repeat(600);
        let chunks = split_chunks(&text, 1000, 200);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
        assert_eq!(split_chunks("short", 1000, 200), vec!["short".to_string()]);
    }

    #[test]
    fn loads_markdown_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "DWMZ marking on fake knits").unwrap();
        std::fs::write(dir.path().join("skip.txt"), "DWMZ").unwrap();
        let l = GuideLibrary::from_dir(dir.path(), 3).unwrap();
        assert_eq!(l.len(), 1);
        assert!(l.search("dwmz").contains("--- Source: a.md ---"));
        assert!(GuideLibrary::from_dir(&dir.path().join("missing"), 3).is_err());
    }
}
