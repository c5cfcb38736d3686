//! Guest information retriever
//!
//! Loads the gala guest list from a JSON file and ranks guests against a
//! free-text query with Okapi BM25.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{ToolError, ToolInput, ToolOutput, ToolSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::Tool;

const BM25_K1: f64 = 1.5;
const BM25_B: f64 = 0.75;

/// One guest record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub email: String,
}

impl Guest {
    /// Text indexed and returned for this guest
    pub fn document(&self) -> String {
        format!(
            "Name: {}\nRelation: {}\nDescription: {}\nEmail: {}",
            self.name, self.relation, self.description, self.email
        )
    }
}

/// Okapi BM25 index over a fixed set of documents
#[derive(Debug, Clone)]
pub struct Bm25Index {
    docs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
}

impl Bm25Index {
    pub fn new<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut docs = Vec::with_capacity(documents.len());
        let mut doc_lens = Vec::with_capacity(documents.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            doc_lens.push(tokens.len());

            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            docs.push(tf);
        }

        let total: usize = doc_lens.iter().sum();
        let avg_len = if doc_lens.is_empty() {
            0.0
        } else {
            total as f64 / doc_lens.len() as f64
        };

        Self {
            docs,
            doc_lens,
            doc_freq,
            avg_len,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score every document against `query`
    pub fn scores(&self, query: &str) -> Vec<f64> {
        let terms = tokenize(query);
        self.docs
            .iter()
            .zip(&self.doc_lens)
            .map(|(tf, &len)| {
                let norm = if self.avg_len > 0.0 {
                    len as f64 / self.avg_len
                } else {
                    0.0
                };
                terms
                    .iter()
                    .filter_map(|term| tf.get(term).map(|&f| (term, f as f64)))
                    .map(|(term, f)| {
                        self.idf(term) * f * (BM25_K1 + 1.0)
                            / (f + BM25_K1 * (1.0 - BM25_B + BM25_B * norm))
                    })
                    .sum()
            })
            .collect()
    }

    /// Indices of the `k` best matching documents, best first.
    ///
    /// Documents sharing no term with the query are never returned. Ties keep
    /// document order.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<usize> {
        let mut ranked: Vec<(usize, f64)> = self
            .scores(query)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().take(k).map(|(i, _)| i).collect()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Tool answering questions about gala guests
pub struct GuestInfoTool {
    guests: Vec<Guest>,
    index: Bm25Index,
    top_k: usize,
}

impl GuestInfoTool {
    pub fn new(guests: Vec<Guest>, top_k: usize) -> Self {
        let documents: Vec<String> = guests.iter().map(Guest::document).collect();
        Self {
            index: Bm25Index::new(&documents),
            guests,
            top_k: top_k.max(1),
        }
    }

    /// Load the guest list from a JSON array file
    pub fn from_file(path: &Path, top_k: usize) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!(
                "Failed to read guest dataset {}: {}",
                path.display(),
                e
            ))
        })?;
        let guests: Vec<Guest> = serde_json::from_str(&contents).map_err(|e| {
            EngineError::Config(format!(
                "Invalid guest dataset {}: {}",
                path.display(),
                e
            ))
        })?;

        info!("Loaded {} guests from {}", guests.len(), path.display());
        Ok(Self::new(guests, top_k))
    }

    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    /// Best matching guest documents for `query`
    pub fn retrieve(&self, query: &str) -> Vec<String> {
        self.index
            .top_k(query, self.top_k)
            .into_iter()
            .map(|i| self.guests[i].document())
            .collect()
    }
}

#[async_trait]
impl Tool for GuestInfoTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "guest_info_retriever",
            "Retrieves detailed information about gala guests based on their name or relation.",
            &[(
                "query",
                "string",
                "The name or relation of the guest you want information about.",
            )],
        )
    }

    async fn invoke(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        let query = input.param_str("query")?;
        let matches = self.retrieve(&query);
        debug!("Guest query '{}' matched {} guests", query, matches.len());

        if matches.is_empty() {
            return Ok(ToolOutput::text("No matching guest information found."));
        }
        Ok(ToolOutput::text(matches.join("\n\n")))
    }
}
