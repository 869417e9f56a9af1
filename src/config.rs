//! Run configuration.
//!
//! One explicit, validated record replaces loosely-typed keyword parameters. The
//! fields that govern clustering and naming are required in TOML; the ancillary
//! sections (`[clustering]`, `[embedding]`, `[language]`, `[naming]`, `[output]`) are
//! optional and fall back to the defaults documented on each field.
//!
//! ```toml
//! text_column_name = "REMARKS"
//! max_remark_clusters_limit = 10
//! max_name_clusters_limit = 5
//! hdbscan_min_cluster_size = 2
//! hdbscan_min_samples = 2
//! assign_noise_to_nearest_cluster = true
//! noise_assignment_distance_threshold = 0.8
//! embedding_boilerplate_min_df = 0.8
//! target_column_name_words = 7
//!
//! [clustering]
//! linkage = "ward"
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::cluster::{Linkage, Metric};
use crate::error::{Error, Result};

/// Validated pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Column of the input table holding the remark text.
    pub text_column_name: String,
    /// Upper bound on clusters after capping. Must be greater than zero.
    pub max_remark_clusters_limit: usize,
    /// Upper bound on output category columns. Must be greater than zero.
    pub max_name_clusters_limit: usize,
    /// Smallest group HDBSCAN will report. At least 2.
    pub hdbscan_min_cluster_size: usize,
    /// Neighbourhood size for HDBSCAN core distances. At least 1.
    pub hdbscan_min_samples: usize,
    /// Try to place noise remarks into the nearest capped cluster.
    pub assign_noise_to_nearest_cluster: bool,
    /// Largest centroid distance (in `clustering.metric` units) at which noise is reassigned.
    pub noise_assignment_distance_threshold: f32,
    /// Document-frequency fraction, in `(0, 1]`, at or above which a term is boilerplate.
    pub embedding_boilerplate_min_df: f32,
    /// Word budget for generated category names. Must be greater than zero.
    pub target_column_name_words: usize,
    #[serde(default)]
    pub clustering: ClusteringOptions,
    #[serde(default)]
    pub embedding: EmbeddingOptions,
    #[serde(default)]
    pub language: LanguageOptions,
    #[serde(default)]
    pub naming: NamingOptions,
    #[serde(default)]
    pub output: OutputOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusteringOptions {
    /// Distance metric for density clustering, capping, and noise reassignment.
    /// Default `euclidean`.
    pub metric: Metric,
    /// Linkage for both hierarchical merge passes. Default `ward`.
    pub linkage: Linkage,
    /// L2-normalize embeddings before clustering. Default `true`.
    pub normalize_embeddings: bool,
}

impl Default for ClusteringOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            linkage: Linkage::Ward,
            normalize_embeddings: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingOptions {
    /// Texts per embedder call. Default 64.
    pub batch_size: usize,
    /// Strip corpus-wide boilerplate phrases from remarks before embedding. Default `true`.
    pub strip_boilerplate: bool,
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self {
            batch_size: 64,
            strip_boilerplate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageOptions {
    /// Run language detection and route non-English remarks through the translator.
    /// Default `true`.
    pub detect: bool,
    /// Texts with fewer non-whitespace characters skip detection. Default 10.
    pub min_text_for_detection: usize,
    /// Where texts too short (or without letters) for detection go. Default `english`.
    pub short_text_policy: ShortTextPolicy,
}

impl Default for LanguageOptions {
    fn default() -> Self {
        Self {
            detect: true,
            min_text_for_detection: 10,
            short_text_policy: ShortTextPolicy::English,
        }
    }
}

/// Handling of remarks the language detector cannot judge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortTextPolicy {
    /// Keep them in the English stream.
    #[default]
    English,
    /// Set them aside with the other-language remarks, untranslated.
    OtherLanguage,
}

/// How category names are compared when too many categories remain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameSimilarity {
    /// Re-embed each name with the pipeline's embedder.
    #[default]
    Embedding,
    /// Compare the clusters' keyword sets as binary bag-of-keywords vectors.
    Keywords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingOptions {
    /// Name representation for the second merge pass. Default `embedding`.
    pub name_similarity: NameSimilarity,
    /// Regenerate a merged category's name from all of its remarks, instead of keeping
    /// the name of its largest constituent. Default `false`.
    pub rename_merged_categories: bool,
    /// Longest RAKE phrase considered, in words. Default 5.
    pub max_phrase_words: usize,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            name_similarity: NameSimilarity::Embedding,
            rename_merged_categories: false,
            max_phrase_words: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputOptions {
    /// Default `Uncategorized`.
    pub uncategorized_column_name: String,
    /// Default `Other Language Remarks`.
    pub other_language_column_name: String,
    /// Give untranslated non-English remarks their own column instead of sending them
    /// to the uncategorized column. Default `true`.
    pub separate_other_language: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            uncategorized_column_name: "Uncategorized".to_string(),
            other_language_column_name: "Other Language Remarks".to_string(),
            separate_other_language: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_column_name: "REMARKS".to_string(),
            max_remark_clusters_limit: 10,
            max_name_clusters_limit: 5,
            hdbscan_min_cluster_size: 2,
            hdbscan_min_samples: 2,
            assign_noise_to_nearest_cluster: false,
            noise_assignment_distance_threshold: 0.8,
            embedding_boilerplate_min_df: 0.8,
            target_column_name_words: 7,
            clustering: ClusteringOptions::default(),
            embedding: EmbeddingOptions::default(),
            language: LanguageOptions::default(),
            naming: NamingOptions::default(),
            output: OutputOptions::default(),
        }
    }
}

/// Read, parse, and validate a TOML configuration file.
pub fn load(path: &Path) -> Result<PipelineConfig> {
    let raw = fs::read_to_string(path).map_err(|err| Error::ReadConfig {
        path: path.to_path_buf(),
        source: err,
    })?;
    parse(&raw, path)
}

fn parse(raw: &str, path: &Path) -> Result<PipelineConfig> {
    let cfg: PipelineConfig = toml::from_str(raw).map_err(|err| Error::ParseConfig {
        path: path.to_path_buf(),
        source: err,
    })?;
    cfg.validate()?;
    Ok(cfg)
}

impl PipelineConfig {
    /// Parse and validate an in-memory TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        parse(raw, Path::new("<inline>"))
    }

    /// Validate and return `self`.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        if self.text_column_name.trim().is_empty() {
            return Err(Error::config("text_column_name must be non-empty."));
        }
        for (label, value) in [
            ("max_remark_clusters_limit", self.max_remark_clusters_limit),
            ("max_name_clusters_limit", self.max_name_clusters_limit),
            ("target_column_name_words", self.target_column_name_words),
            ("hdbscan_min_samples", self.hdbscan_min_samples),
            ("embedding.batch_size", self.embedding.batch_size),
            ("naming.max_phrase_words", self.naming.max_phrase_words),
        ] {
            if value == 0 {
                return Err(Error::config(format!("{label} must be greater than zero.")));
            }
        }
        if self.hdbscan_min_cluster_size < 2 {
            return Err(Error::config("hdbscan_min_cluster_size must be at least 2."));
        }
        if !self.noise_assignment_distance_threshold.is_finite() {
            return Err(Error::config(
                "noise_assignment_distance_threshold must be a finite number.",
            ));
        }
        if self.noise_assignment_distance_threshold < 0.0 {
            return Err(Error::config(
                "noise_assignment_distance_threshold must be zero or greater.",
            ));
        }
        let min_df = self.embedding_boilerplate_min_df;
        if !min_df.is_finite() || min_df <= 0.0 || min_df > 1.0 {
            return Err(Error::config(
                "embedding_boilerplate_min_df must be in the range (0.0, 1.0].",
            ));
        }
        if self.clustering.linkage == Linkage::Ward && self.clustering.metric != Metric::Euclidean
        {
            return Err(Error::config(
                "clustering.linkage ward requires clustering.metric euclidean.",
            ));
        }
        for (label, value) in [
            ("output.uncategorized_column_name", &self.output.uncategorized_column_name),
            ("output.other_language_column_name", &self.output.other_language_column_name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{label} must be non-empty.")));
            }
        }
        if self
            .output
            .uncategorized_column_name
            .eq_ignore_ascii_case(&self.output.other_language_column_name)
        {
            return Err(Error::config(
                "output.uncategorized_column_name and output.other_language_column_name must differ.",
            ));
        }
        Ok(())
    }

    /// `true` when the name cap cannot bind because it exceeds the cluster cap.
    pub fn name_limit_exceeds_cluster_limit(&self) -> bool {
        self.max_name_clusters_limit > self.max_remark_clusters_limit
    }
}
