//! Unsupervised categorization of free-text remarks.
//!
//! `remark-clusters` turns a column of short texts (feedback, incident notes, service
//! remarks) into a small, bounded set of human-named categories, without labeled
//! training data:
//!
//! - embed each remark ([`Embedder`])
//! - group embeddings by density, leaving sparse remarks as noise ([`cluster::Hdbscan`])
//! - merge clusters down to `max_remark_clusters_limit` ([`pipeline::ClusterCapper`])
//! - optionally pull noise into the nearest cluster ([`pipeline::NoiseReassigner`])
//! - name each cluster from TF-IDF terms and RAKE phrases ([`naming::NameGenerator`])
//! - merge near-duplicate names down to `max_name_clusters_limit` ([`naming::NameMerger`])
//! - lay the result out as a wide table ([`pipeline::OutputTable`])
//!
//! The numeric algorithms live under [`cluster`] and work on plain `Vec<f32>` data;
//! [`Pipeline`] wires them to the domain types.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod config;
pub mod embedding;
pub mod error;
pub mod language;
pub mod lexicon;
pub mod naming;
pub mod pipeline;
pub mod remark;
pub mod text;

pub use config::{PipelineConfig, ShortTextPolicy};
pub use embedding::{CollaboratorError, Embedder, HashingEmbedder};
pub use error::{Error, Result};
pub use language::{DetectedLanguage, LanguageDetector, NoTranslation, Translator};
pub use lexicon::Lexicon;
pub use pipeline::{Categorization, Pipeline, PipelineWarning};
pub use remark::{Assignment, InputTable, Remark, RemarkId, UncategorizedReason};
