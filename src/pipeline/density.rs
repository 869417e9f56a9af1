//! Density clustering of remark embeddings.

use serde::Serialize;
use tracing::info;

use crate::cluster::{Clustering, Hdbscan, Metric};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::remark::{Assignment, Remark, RemarkId};

/// A group found by density clustering. Ids are dense, numbered by first member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawCluster {
    pub id: usize,
    /// Ascending remark ids; never empty.
    pub members: Vec<RemarkId>,
}

/// Clusters plus the remarks left as noise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DensityClustering {
    pub clusters: Vec<RawCluster>,
    /// Ascending remark ids belonging to no cluster.
    pub noise: Vec<RemarkId>,
}

impl DensityClustering {
    /// Every remark is noise.
    pub fn is_degenerate(&self) -> bool {
        self.clusters.is_empty()
    }

    /// State of `id` after this stage, `None` for remarks not clustered here.
    pub fn assignment(&self, id: RemarkId) -> Option<Assignment> {
        if self.noise.binary_search(&id).is_ok() {
            return Some(Assignment::Noise);
        }
        self.clusters
            .iter()
            .find(|c| c.members.binary_search(&id).is_ok())
            .map(|c| Assignment::clustered(c.id))
    }
}

/// HDBSCAN over remark embeddings. No cap on the number of clusters.
#[derive(Debug, Clone)]
pub struct DensityClusterer {
    hdbscan: Hdbscan,
}

impl DensityClusterer {
    pub fn new(min_cluster_size: usize, min_samples: usize, metric: Metric) -> Self {
        Self {
            hdbscan: Hdbscan::new()
                .with_min_cluster_size(min_cluster_size)
                .with_min_samples(min_samples)
                .with_metric(metric),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.hdbscan_min_cluster_size,
            config.hdbscan_min_samples,
            config.clustering.metric,
        )
    }

    /// Cluster `remarks`, which must be sorted by id.
    pub fn cluster(&self, remarks: &[Remark]) -> Result<DensityClustering> {
        let data: Vec<Vec<f32>> = remarks.iter().map(|r| r.embedding.clone()).collect();
        let labels = self.hdbscan.fit_predict(&data)?;

        let mut out = DensityClustering::default();
        for (remark, label) in remarks.iter().zip(labels) {
            match label {
                Some(id) => {
                    if id >= out.clusters.len() {
                        out.clusters.resize_with(id + 1, || RawCluster {
                            id: 0,
                            members: Vec::new(),
                        });
                    }
                    out.clusters[id].id = id;
                    out.clusters[id].members.push(remark.id);
                }
                None => out.noise.push(remark.id),
            }
        }
        out.clusters.retain(|c| !c.members.is_empty());

        info!(
            remarks = remarks.len(),
            clusters = out.clusters.len(),
            noise = out.noise.len(),
            algorithm = self.hdbscan.name(),
            "density clustering complete"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remark(id: RemarkId, embedding: Vec<f32>) -> Remark {
        Remark {
            id,
            raw_text: String::new(),
            normalized_text: String::new(),
            embedding,
        }
    }

    #[test]
    fn groups_and_noise_by_remark_id() {
        let remarks = vec![
            remark(0, vec![0.0, 0.0]),
            remark(2, vec![0.0, 0.1]),
            remark(5, vec![0.1, 0.0]),
            remark(6, vec![5.0, 5.0]),
            remark(7, vec![5.0, 5.1]),
            remark(8, vec![5.1, 5.0]),
            remark(9, vec![40.0, -40.0]),
        ];
        let out = DensityClusterer::new(2, 2, Metric::Euclidean)
            .cluster(&remarks)
            .unwrap();
        assert_eq!(out.clusters.len(), 2);
        assert_eq!(out.clusters[0].members, vec![0, 2, 5]);
        assert_eq!(out.clusters[1].members, vec![6, 7, 8]);
        assert_eq!(out.noise, vec![9]);
        assert_eq!(out.assignment(7), Some(Assignment::clustered(1)));
        assert_eq!(out.assignment(9), Some(Assignment::Noise));
        assert_eq!(out.assignment(4), None);
        assert!(!out.is_degenerate());
    }

    #[test]
    fn one_remark_is_all_noise() {
        let out = DensityClusterer::new(2, 2, Metric::Euclidean)
            .cluster(&[remark(3, vec![1.0])])
            .unwrap();
        assert!(out.is_degenerate());
        assert_eq!(out.noise, vec![3]);
    }
}
