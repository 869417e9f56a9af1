//! Reassigning noise remarks to the nearest capped cluster.
//!
//! Every decision depends only on the remark's own embedding and the centroids fixed
//! at capping time, so the outcome cannot depend on the order noise is processed in.

use serde::Serialize;
use tracing::info;

use super::capper::CappedCluster;
use super::lookup;
use crate::cluster::Metric;
use crate::config::PipelineConfig;
use crate::remark::{Assignment, Remark, RemarkId, UncategorizedReason};

/// Outcome for one noise remark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseDecision {
    pub remark_id: RemarkId,
    /// `Clustered` with a capped cluster id, or `Uncategorized`.
    pub assignment: Assignment,
    /// Distance to the nearest centroid, when one was computed.
    pub distance: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct NoiseReassigner {
    enabled: bool,
    threshold: f32,
    metric: Metric,
}

impl NoiseReassigner {
    pub fn new(enabled: bool, threshold: f32, metric: Metric) -> Self {
        Self {
            enabled,
            threshold,
            metric,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.assign_noise_to_nearest_cluster,
            config.noise_assignment_distance_threshold,
            config.clustering.metric,
        )
    }

    /// Nearest centroid to `embedding`; exact ties go to the lowest cluster id.
    fn nearest(&self, embedding: &[f32], clusters: &[CappedCluster]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for c in clusters {
            let d = self.metric.distance(embedding, &c.centroid);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((c.id, d));
            }
        }
        best
    }

    /// Decide every remark in `noise`. `remarks` must be sorted by id.
    pub fn reassign(
        &self,
        noise: &[RemarkId],
        clusters: &[CappedCluster],
        remarks: &[Remark],
    ) -> Vec<NoiseDecision> {
        let decisions: Vec<NoiseDecision> = noise
            .iter()
            .map(|&remark_id| {
                let stay = |distance| NoiseDecision {
                    remark_id,
                    assignment: Assignment::uncategorized(UncategorizedReason::Noise),
                    distance,
                };
                if !self.enabled {
                    return stay(None);
                }
                let Some(remark) = lookup(remarks, remark_id) else {
                    return stay(None);
                };
                match self.nearest(&remark.embedding, clusters) {
                    None => stay(None),
                    Some((cluster_id, d)) if d <= self.threshold => NoiseDecision {
                        remark_id,
                        assignment: Assignment::clustered(cluster_id),
                        distance: Some(d),
                    },
                    Some((_, d)) => NoiseDecision {
                        remark_id,
                        assignment: Assignment::uncategorized(UncategorizedReason::BeyondThreshold),
                        distance: Some(d),
                    },
                }
            })
            .collect();

        if self.enabled {
            let reassigned = decisions
                .iter()
                .filter(|d| d.assignment.cluster_id().is_some())
                .count();
            info!(
                noise = noise.len(),
                reassigned,
                threshold = self.threshold,
                "noise reassignment complete"
            );
        }
        decisions
    }
}

/// Add reassigned remarks to their clusters. Centroids are left untouched.
pub fn apply(mut clusters: Vec<CappedCluster>, decisions: &[NoiseDecision]) -> Vec<CappedCluster> {
    for d in decisions {
        if let Some(id) = d.assignment.cluster_id() {
            if let Some(c) = clusters.iter_mut().find(|c| c.id == id) {
                c.members.push(d.remark_id);
            }
        }
    }
    for c in &mut clusters {
        c.members.sort_unstable();
    }
    clusters
}
