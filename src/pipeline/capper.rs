//! Capping the number of clusters by merging centroids.

use serde::Serialize;
use tracing::{debug, info};

use super::density::RawCluster;
use super::lookup;
use crate::cluster::util::mean;
use crate::cluster::{Agglomerative, Linkage, Metric};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::remark::{Remark, RemarkId};

/// One or more raw clusters merged into a single group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CappedCluster {
    /// Dense id, ordered by the smallest raw cluster id merged into it.
    pub id: usize,
    /// Ascending ids of the raw clusters merged here.
    pub raw_cluster_ids: Vec<usize>,
    /// Mean embedding of the members at capping time. Fixed afterwards.
    pub centroid: Vec<f32>,
    /// Ascending remark ids.
    pub members: Vec<RemarkId>,
}

impl CappedCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Merges raw clusters over their centroids until at most `limit` remain.
#[derive(Debug, Clone)]
pub struct ClusterCapper {
    limit: usize,
    merger: Agglomerative,
    metric: Metric,
}

impl ClusterCapper {
    pub fn new(limit: usize, linkage: Linkage, metric: Metric) -> Self {
        Self {
            limit,
            merger: Agglomerative::new(linkage),
            metric,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.max_remark_clusters_limit,
            config.clustering.linkage,
            config.clustering.metric,
        )
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cap `raw` clusters. `remarks` must be sorted by id and hold every member.
    ///
    /// At or under the limit every raw cluster passes through unchanged.
    pub fn cap(&self, raw: &[RawCluster], remarks: &[Remark]) -> Result<Vec<CappedCluster>> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        let centroids = raw
            .iter()
            .map(|c| centroid(&c.members, remarks))
            .collect::<Result<Vec<_>>>()?;

        if raw.len() <= self.limit {
            debug!(clusters = raw.len(), limit = self.limit, "cluster cap not reached");
            return Ok(raw
                .iter()
                .zip(centroids)
                .enumerate()
                .map(|(id, (c, centroid))| CappedCluster {
                    id,
                    raw_cluster_ids: vec![c.id],
                    centroid,
                    members: c.members.clone(),
                })
                .collect());
        }

        let plan = self.merger.merge_points(&centroids, self.metric, self.limit)?;
        let mut capped = Vec::with_capacity(plan.groups.len());
        for (id, group) in plan.groups.iter().enumerate() {
            let mut members: Vec<RemarkId> = group
                .iter()
                .flat_map(|&g| raw[g].members.iter().copied())
                .collect();
            members.sort_unstable();
            let centroid = centroid(&members, remarks)?;
            capped.push(CappedCluster {
                id,
                raw_cluster_ids: group.iter().map(|&g| raw[g].id).collect(),
                centroid,
                members,
            });
        }
        info!(
            raw_clusters = raw.len(),
            capped_clusters = capped.len(),
            merges = plan.steps.len(),
            linkage = self.merger.linkage().as_str(),
            "cluster cap applied"
        );
        Ok(capped)
    }
}

fn centroid(members: &[RemarkId], remarks: &[Remark]) -> Result<Vec<f32>> {
    let embeddings = members
        .iter()
        .filter_map(|&id| lookup(remarks, id))
        .map(|r| r.embedding.as_slice());
    mean(embeddings).ok_or(Error::EmptyInput)
}
