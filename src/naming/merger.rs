//! Collapsing near-duplicate category names.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use super::generator::NamedCluster;
use crate::cluster::util::normalize_in_place;
use crate::cluster::{Agglomerative, Linkage, Metric};
use crate::config::PipelineConfig;
use crate::embedding::{check_vector, CollaboratorError, Embedder};
use crate::error::{Error, Result};
use crate::remark::RemarkId;

/// An output category: one or more named clusters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalCategory {
    /// Dense id, ordered by the smallest named cluster id in the category.
    pub id: usize,
    pub name: String,
    /// Ascending ids of the named clusters merged here.
    pub named_cluster_ids: Vec<usize>,
    /// Ascending remark ids.
    pub members: Vec<RemarkId>,
}

impl FinalCategory {
    pub fn is_merged(&self) -> bool {
        self.named_cluster_ids.len() > 1
    }
}

/// Second merge pass, over name vectors, bounded by `limit` categories.
#[derive(Debug, Clone)]
pub struct NameMerger {
    limit: usize,
    merger: Agglomerative,
    metric: Metric,
}

impl NameMerger {
    pub fn new(limit: usize, linkage: Linkage, metric: Metric) -> Self {
        Self {
            limit,
            merger: Agglomerative::new(linkage),
            metric,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.max_name_clusters_limit,
            config.clustering.linkage,
            config.clustering.metric,
        )
    }

    /// `true` when `count` named clusters would be merged.
    pub fn needs_merge(&self, count: usize) -> bool {
        count > self.limit
    }

    /// Merge `named` into at most `limit` categories.
    ///
    /// `vectors` is position-aligned with `named` and only read when a merge is
    /// needed. A merged category takes the name of its largest constituent, the
    /// lowest named cluster id winning ties.
    pub fn merge(&self, named: &[NamedCluster], vectors: &[Vec<f32>]) -> Result<Vec<FinalCategory>> {
        if !self.needs_merge(named.len()) {
            return Ok(named
                .iter()
                .enumerate()
                .map(|(id, n)| FinalCategory {
                    id,
                    name: n.name.clone(),
                    named_cluster_ids: vec![n.id()],
                    members: n.members().to_vec(),
                })
                .collect());
        }

        if vectors.len() != named.len() {
            return Err(Error::InvalidParameter {
                name: "vectors",
                message: "one vector per named cluster is required",
            });
        }
        let plan = self.merger.merge_points(vectors, self.metric, self.limit)?;
        let categories: Vec<FinalCategory> = plan
            .groups
            .iter()
            .enumerate()
            .map(|(id, group)| {
                let mut largest = group[0];
                for &g in &group[1..] {
                    if named[g].members().len() > named[largest].members().len() {
                        largest = g;
                    }
                }
                let mut members: Vec<RemarkId> = group
                    .iter()
                    .flat_map(|&g| named[g].members().iter().copied())
                    .collect();
                members.sort_unstable();
                FinalCategory {
                    id,
                    name: named[largest].name.clone(),
                    named_cluster_ids: group.iter().map(|&g| named[g].id()).collect(),
                    members,
                }
            })
            .collect();
        info!(
            named_clusters = named.len(),
            categories = categories.len(),
            merges = plan.steps.len(),
            "category names merged"
        );
        Ok(categories)
    }
}

/// Binary bag-of-keyword-words vectors, L2-normalized.
///
/// Clusters without keywords fall back to the words of their name.
pub fn keyword_vectors(named: &[NamedCluster]) -> Vec<Vec<f32>> {
    let words_of = |n: &NamedCluster| -> BTreeSet<String> {
        let source: Vec<&str> = if n.keywords.is_empty() {
            vec![n.name.as_str()]
        } else {
            n.keywords.iter().map(String::as_str).collect()
        };
        source
            .iter()
            .flat_map(|k| k.split_whitespace())
            .map(str::to_lowercase)
            .collect()
    };
    let per_cluster: Vec<BTreeSet<String>> = named.iter().map(words_of).collect();
    let vocabulary: Vec<&String> = per_cluster
        .iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    per_cluster
        .iter()
        .map(|words| {
            let mut v: Vec<f32> = vocabulary
                .iter()
                .map(|w| if words.contains(*w) { 1.0 } else { 0.0 })
                .collect();
            normalize_in_place(&mut v);
            v
        })
        .collect()
}

/// Embed every name with `embedder`, L2-normalized. Fails on the first bad name.
pub fn name_embeddings<E: Embedder + ?Sized>(
    named: &[NamedCluster],
    embedder: &E,
) -> std::result::Result<Vec<Vec<f32>>, CollaboratorError> {
    let names: Vec<&str> = named.iter().map(|n| n.name.as_str()).collect();
    let results = embedder.embed_batch(&names);
    if results.len() != names.len() {
        return Err(CollaboratorError::failed(format!(
            "embedder returned {} vectors for {} names",
            results.len(),
            names.len()
        )));
    }
    results
        .into_iter()
        .map(|r| -> std::result::Result<Vec<f32>, CollaboratorError> {
            let mut v = r?;
            check_vector(&v, embedder.dimension())?;
            normalize_in_place(&mut v);
            Ok(v)
        })
        .collect()
}
