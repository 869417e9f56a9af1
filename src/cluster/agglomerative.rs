//! Agglomerative (hierarchical) merging down to a fixed group count.
//!
//! Every item starts as its own group. At each step the pair of groups with the
//! minimum linkage distance is merged, until exactly `target` groups remain.
//! Linkage distances are updated with the Lance–Williams recurrence, so only the
//! initial pairwise distances are ever computed from item data.
//!
//! # Tie-break
//!
//! A group is keyed by its smallest item index, which is an original cluster id.
//! Among pairs at exactly equal linkage distance, the pair with the lowest combined
//! key `lower + higher` wins, and the lower key settles what is left. The result is
//! therefore a pure function of the item order and distances.
//!
//! The same routine serves any vector space: callers supply `distance(i, j)`.

use serde::{Deserialize, Serialize};

use super::metric::Metric;
use crate::error::{Error, Result};

/// Inter-group distance used when two groups are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Minimum pairwise distance.
    Single,
    /// Maximum pairwise distance.
    Complete,
    /// Mean pairwise distance (UPGMA).
    Average,
    /// Increase in within-group variance. Meaningful for Euclidean distances only.
    #[default]
    Ward,
}

impl Linkage {
    /// Lowercase name, matching the configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Linkage::Single => "single",
            Linkage::Complete => "complete",
            Linkage::Average => "average",
            Linkage::Ward => "ward",
        }
    }

    /// Lance–Williams update: distance from group `k` to the union of `i` and `j`.
    fn update(self, d_ik: f64, d_jk: f64, d_ij: f64, n_i: f64, n_j: f64, n_k: f64) -> f64 {
        match self {
            Linkage::Single => d_ik.min(d_jk),
            Linkage::Complete => d_ik.max(d_jk),
            Linkage::Average => (n_i * d_ik + n_j * d_jk) / (n_i + n_j),
            Linkage::Ward => {
                let total = n_i + n_j + n_k;
                let sq = ((n_i + n_k) * d_ik * d_ik + (n_j + n_k) * d_jk * d_jk
                    - n_k * d_ij * d_ij)
                    / total;
                sq.max(0.0).sqrt()
            }
        }
    }
}

/// One merge performed by [`Agglomerative`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStep {
    /// Key (smallest item index) of the lower-keyed group.
    pub left: usize,
    /// Key of the higher-keyed group, absorbed into `left`.
    pub right: usize,
    /// Linkage distance at which the merge happened.
    pub distance: f64,
}

/// Output of a merge run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// Item indices per group. Members ascending; groups ordered by smallest member.
    pub groups: Vec<Vec<usize>>,
    /// Merges in the order they were applied.
    pub steps: Vec<MergeStep>,
}

/// Agglomerative merger with a fixed linkage.
#[derive(Debug, Clone, Default)]
pub struct Agglomerative {
    linkage: Linkage,
}

impl Agglomerative {
    /// Create a merger using `linkage`.
    pub fn new(linkage: Linkage) -> Self {
        Self { linkage }
    }

    /// The configured linkage.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Merge vectors under `metric` until `target` groups remain.
    pub fn merge_points(&self, points: &[Vec<f32>], metric: Metric, target: usize) -> Result<MergePlan> {
        if let Some(first) = points.first() {
            for p in points.iter().skip(1) {
                if p.len() != first.len() {
                    return Err(Error::DimensionMismatch {
                        expected: first.len(),
                        found: p.len(),
                    });
                }
            }
        }
        self.merge_to(points.len(), target, |i, j| metric.distance(&points[i], &points[j]))
    }

    /// Merge `n_items` items until `target` groups remain.
    ///
    /// When `target >= n_items` no merge happens and every item is its own group.
    pub fn merge_to(
        &self,
        n_items: usize,
        target: usize,
        distance: impl Fn(usize, usize) -> f32,
    ) -> Result<MergePlan> {
        if n_items == 0 {
            return Err(Error::EmptyInput);
        }
        if target == 0 {
            return Err(Error::InvalidClusterCount {
                requested: target,
                n_items,
            });
        }

        let n = n_items;
        let mut dist = vec![0.0f64; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = distance(i, j) as f64;
                if !d.is_finite() {
                    return Err(Error::InvalidParameter {
                        name: "distance",
                        message: "pairwise distances must be finite",
                    });
                }
                dist[i * n + j] = d;
                dist[j * n + i] = d;
            }
        }

        // Slot i holds the group keyed by item i while active.
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut active: Vec<bool> = vec![true; n];
        let mut remaining = n;
        let mut steps = Vec::with_capacity(n.saturating_sub(target));

        while remaining > target {
            let mut best: Option<(f64, usize, usize)> = None;
            for i in 0..n {
                if !active[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if !active[j] {
                        continue;
                    }
                    let d = dist[i * n + j];
                    if best.is_none_or(|(bd, bi, bj)| d < bd || (d == bd && i + j < bi + bj)) {
                        best = Some((d, i, j));
                    }
                }
            }
            let Some((d_ij, i, j)) = best else {
                break;
            };

            let n_i = members[i].len() as f64;
            let n_j = members[j].len() as f64;
            for k in 0..n {
                if !active[k] || k == i || k == j {
                    continue;
                }
                let n_k = members[k].len() as f64;
                let d = self
                    .linkage
                    .update(dist[i * n + k], dist[j * n + k], d_ij, n_i, n_j, n_k);
                dist[i * n + k] = d;
                dist[k * n + i] = d;
            }

            let absorbed = std::mem::take(&mut members[j]);
            members[i].extend(absorbed);
            members[i].sort_unstable();
            active[j] = false;
            remaining -= 1;
            steps.push(MergeStep {
                left: i,
                right: j,
                distance: d_ij,
            });
        }

        let groups = members
            .into_iter()
            .zip(active)
            .filter_map(|(m, a)| a.then_some(m))
            .collect();
        Ok(MergePlan { groups, steps })
    }
}
