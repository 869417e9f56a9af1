//! Remarks and their assignment state.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stable index of a remark's row in the input table.
pub type RemarkId = usize;

/// A remark that reached the clustering stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Remark {
    /// Row index in the input.
    pub id: RemarkId,
    /// Text exactly as read from the input column.
    pub raw_text: String,
    /// Lowercased, whitespace-collapsed, translated and boilerplate-stripped text.
    pub normalized_text: String,
    /// Embedding of `normalized_text`, computed once.
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// Why a remark ended up outside every category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UncategorizedReason {
    /// Density clustering left it as noise and reassignment was disabled or impossible.
    Noise,
    /// Nearest centroid was farther than the reassignment threshold.
    BeyondThreshold,
    /// The embedder failed or produced an unusable vector.
    EmbeddingFailed { message: String },
    /// Translation to English failed.
    TranslationFailed { message: String },
    /// Detected as non-English and no translation was available.
    OtherLanguage { language: String },
}

impl UncategorizedReason {
    /// Short reason label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            UncategorizedReason::Noise => "noise",
            UncategorizedReason::BeyondThreshold => "beyond_threshold",
            UncategorizedReason::EmbeddingFailed { .. } => "embedding_failed",
            UncategorizedReason::TranslationFailed { .. } => "translation_failed",
            UncategorizedReason::OtherLanguage { .. } => "other_language",
        }
    }
}

/// Where a remark currently sits in the pipeline.
///
/// Noise is a state of its own rather than a sentinel cluster id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Assignment {
    /// Member of the cluster with this id (raw or capped, depending on the stage).
    Clustered { cluster_id: usize },
    /// Density clustering found no group for it; undecided until noise reassignment.
    Noise,
    /// Permanently outside every category.
    Uncategorized { reason: UncategorizedReason },
}

impl Assignment {
    pub fn clustered(cluster_id: usize) -> Self {
        Assignment::Clustered { cluster_id }
    }

    pub fn uncategorized(reason: UncategorizedReason) -> Self {
        Assignment::Uncategorized { reason }
    }

    pub fn cluster_id(&self) -> Option<usize> {
        match self {
            Assignment::Clustered { cluster_id } => Some(*cluster_id),
            _ => None,
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, Assignment::Noise)
    }
}

/// Minimal in-memory table: named columns, rows of optional cells.
///
/// Reading and writing file formats is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl InputTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// A one-column table.
    pub fn single_column(header: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        Self {
            headers: vec![header.into()],
            rows: cells.into_iter().map(|c| vec![c]).collect(),
        }
    }

    /// Cells of the column called `name`, one per row. Short rows read as empty.
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                Error::config(format!(
                    "text column {name:?} not found. Available columns: {:?}",
                    self.headers
                ))
            })?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).and_then(|c| c.as_deref()))
            .collect())
    }
}
