//! HDBSCAN: Hierarchical Density-Based Spatial Clustering of Applications with Noise.
//!
//! HDBSCAN (Campello, Moulavi, Sander 2013) extends DBSCAN by removing the global
//! epsilon parameter and instead building a hierarchy of density-based clusters.
//! It selects the most stable clusters from the hierarchy automatically.
//!
//! # Algorithm Outline
//!
//! 1. **Core distance**: For each point, the distance to its `min_samples`-th nearest
//!    neighbour, counting the point itself as the first. This estimates local density.
//!
//! 2. **Mutual reachability distance**: For each pair (i, j):
//!    `mrd(i, j) = max(core_dist[i], core_dist[j], dist(i, j))`.
//!
//! 3. **MST on mutual reachability graph**: Prim's algorithm over the dense graph (O(n^2)).
//!
//! 4. **Single-linkage tree**: MST edges in ascending order (ties broken by endpoint
//!    index), merged with union-find into a binary dendrogram.
//!
//! 5. **Condensed tree**: Walk the dendrogram from the root. A split where both sides
//!    hold at least `min_cluster_size` points gives birth to two child clusters; a
//!    smaller side "falls out" of its parent as individual points.
//!
//! 6. **Excess-of-mass selection**: stability(c) = Σ (lambda_fallout - lambda_birth(c))
//!    over the points and child clusters leaving c. Bottom-up, a cluster is kept when its
//!    stability beats the summed stability of its selected descendants.
//!
//! 7. **Noise labeling**: Points outside every selected cluster are noise.
//!
//! Two conventions matter for small embedding sets:
//!
//! - The root cluster is never selected unless [`Hdbscan::with_allow_single_cluster`]
//!   is set. A dataset with no density split therefore comes back as all noise.
//! - A selected cluster with zero stability (born and dissolved at the same density)
//!   is not a cluster. Points that are all mutually equidistant are noise.
//!
//! # Complexity
//!
//! O(n^2) time and space for the dense pairwise distance computation.
//!
//! # References
//!
//! Campello, R. J. G. B., Moulavi, D., Sander, J. (2013). "Density-Based Clustering
//! Based on Hierarchical Density Estimates." PAKDD 2013.

use super::metric::Metric;
use super::traits::Clustering;
use super::util::{self, UnionFind};
use crate::error::{Error, Result};

/// Largest lambda (inverse distance) recorded; keeps duplicate points finite.
const MAX_LAMBDA: f64 = 1e12;

/// HDBSCAN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_samples: usize,
    min_cluster_size: usize,
    metric: Metric,
    allow_single_cluster: bool,
}

impl Hdbscan {
    /// Create a new HDBSCAN clusterer with default parameters.
    ///
    /// Defaults: `min_samples = 5`, `min_cluster_size = 5`, Euclidean metric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `min_samples` (k for core distance computation, the point itself included).
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Set `min_cluster_size` (minimum points for a cluster to persist).
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Allow the root of the hierarchy (the whole dataset) to be selected as one cluster.
    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }

    fn validate(&self, data: &[Vec<f32>]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.min_samples == 0 {
            return Err(Error::InvalidParameter {
                name: "min_samples",
                message: "must be at least 1",
            });
        }
        if self.min_cluster_size < 2 {
            return Err(Error::InvalidParameter {
                name: "min_cluster_size",
                message: "must be at least 2",
            });
        }

        let d = data[0].len();
        if d == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        for point in data.iter().skip(1) {
            if point.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: point.len(),
                });
            }
        }
        if data.iter().flatten().any(|x| !x.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "data",
                message: "all coordinates must be finite",
            });
        }
        Ok(())
    }
}

impl Default for Hdbscan {
    fn default() -> Self {
        Self {
            min_samples: 5,
            min_cluster_size: 5,
            metric: Metric::Euclidean,
            allow_single_cluster: false,
        }
    }
}

impl Clustering for Hdbscan {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>> {
        self.validate(data)?;

        let n = data.len();
        if n == 1 {
            return Ok(vec![None]);
        }

        let dists = pairwise_distances(data, self.metric);
        let core_dists = core_distances(&dists, n, self.min_samples);

        let mut mst = util::prim_mst(n, |i, j| {
            mutual_reachability(dists[i * n + j], core_dists[i], core_dists[j])
        });
        for edge in mst.iter_mut() {
            if edge.0 > edge.1 {
                std::mem::swap(&mut edge.0, &mut edge.1);
            }
        }
        mst.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

        let tree = LinkageTree::from_sorted_mst(&mst, n);
        let condensed = CondensedTree::build(&tree, self.min_cluster_size);
        let selected = condensed.select(self.allow_single_cluster);
        Ok(condensed.label_points(&selected))
    }

    fn name(&self) -> &'static str {
        "hdbscan"
    }
}

fn pairwise_distances(data: &[Vec<f32>], metric: Metric) -> Vec<f32> {
    let n = data.len();
    let mut dists = vec![0.0f32; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.distance(&data[i], &data[j]);
            dists[i * n + j] = d;
            dists[j * n + i] = d;
        }
    }
    dists
}

fn core_distances(dists: &[f32], n: usize, min_samples: usize) -> Vec<f32> {
    // The point itself is its own first neighbour.
    let k = (min_samples - 1).min(n - 1);
    if k == 0 {
        return vec![0.0; n];
    }
    let mut core = Vec::with_capacity(n);
    for i in 0..n {
        let mut row: Vec<f32> = (0..n)
            .filter(|&j| j != i)
            .map(|j| dists[i * n + j])
            .collect();
        row.sort_by(|a, b| a.total_cmp(b));
        core.push(row[k - 1]);
    }
    core
}

#[inline]
fn mutual_reachability(dist: f32, core_i: f32, core_j: f32) -> f32 {
    dist.max(core_i).max(core_j)
}

#[inline]
fn lambda_of(dist: f32) -> f64 {
    if dist > 0.0 {
        (1.0 / dist as f64).min(MAX_LAMBDA)
    } else {
        MAX_LAMBDA
    }
}

// ---------------------------------------------------------------------------
// Single-linkage tree
// ---------------------------------------------------------------------------

/// Binary dendrogram. Node ids `0..n` are points; internal node `n + k` is the k-th merge.
struct LinkageTree {
    n: usize,
    children: Vec<(usize, usize)>,
    distance: Vec<f32>,
    size: Vec<usize>,
}

impl LinkageTree {
    fn from_sorted_mst(mst: &[(usize, usize, f32)], n: usize) -> Self {
        let mut uf = UnionFind::new(n);
        // UF root -> dendrogram node currently representing that component.
        let mut node_of: Vec<usize> = (0..n).collect();
        let mut children = Vec::with_capacity(n.saturating_sub(1));
        let mut distance = Vec::with_capacity(n.saturating_sub(1));
        let mut size = Vec::with_capacity(n.saturating_sub(1));

        for &(u, v, d) in mst {
            let ru = uf.find(u);
            let rv = uf.find(v);
            if ru == rv {
                continue;
            }
            let node = n + children.len();
            children.push((node_of[ru], node_of[rv]));
            distance.push(d);
            size.push(uf.size[ru] + uf.size[rv]);
            let root = uf.link(ru, rv);
            node_of[root] = node;
        }

        Self {
            n,
            children,
            distance,
            size,
        }
    }

    fn root(&self) -> Option<usize> {
        if self.children.is_empty() {
            None
        } else {
            Some(self.n + self.children.len() - 1)
        }
    }

    fn node_size(&self, node: usize) -> usize {
        if node < self.n {
            1
        } else {
            self.size[node - self.n]
        }
    }

    /// All point ids under `node`.
    fn leaves(&self, node: usize, out: &mut Vec<usize>) {
        let mut stack = vec![node];
        while let Some(x) = stack.pop() {
            if x < self.n {
                out.push(x);
            } else {
                let (l, r) = self.children[x - self.n];
                stack.push(r);
                stack.push(l);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Condensed cluster tree
// ---------------------------------------------------------------------------

/// How an item leaves a condensed cluster.
#[derive(Debug, Clone, Copy)]
enum Child {
    Point(usize),
    Cluster(usize),
}

/// One row of the condensed tree, stored as a flat table.
#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: Child,
    lambda: f64,
    child_size: usize,
}

/// Condensed tree over cluster labels `0..num_clusters`; label 0 is the root.
///
/// Child clusters always carry larger labels than their parent.
struct CondensedTree {
    n: usize,
    num_clusters: usize,
    root_size: usize,
    min_cluster_size: usize,
    edges: Vec<CondensedEdge>,
}

impl CondensedTree {
    fn build(tree: &LinkageTree, min_cluster_size: usize) -> Self {
        let n = tree.n;
        let mut edges = Vec::new();
        let Some(root) = tree.root() else {
            return Self {
                n,
                num_clusters: 0,
                root_size: n,
                min_cluster_size,
                edges,
            };
        };

        let mut num_clusters = 1usize;
        // (dendrogram node, condensed cluster label it belongs to)
        let mut stack = vec![(root, 0usize)];
        let mut fallen = Vec::new();

        while let Some((node, label)) = stack.pop() {
            if node < n {
                continue;
            }
            let (left, right) = tree.children[node - n];
            let lambda = lambda_of(tree.distance[node - n]);
            let left_size = tree.node_size(left);
            let right_size = tree.node_size(right);
            let left_big = left_size >= min_cluster_size;
            let right_big = right_size >= min_cluster_size;

            if left_big && right_big {
                for (child, child_size) in [(left, left_size), (right, right_size)] {
                    let child_label = num_clusters;
                    num_clusters += 1;
                    edges.push(CondensedEdge {
                        parent: label,
                        child: Child::Cluster(child_label),
                        lambda,
                        child_size,
                    });
                    stack.push((child, child_label));
                }
                continue;
            }

            for (child, big) in [(left, left_big), (right, right_big)] {
                if big {
                    stack.push((child, label));
                } else {
                    fallen.clear();
                    tree.leaves(child, &mut fallen);
                    for &p in &fallen {
                        edges.push(CondensedEdge {
                            parent: label,
                            child: Child::Point(p),
                            lambda,
                            child_size: 1,
                        });
                    }
                }
            }
        }

        Self {
            n,
            num_clusters,
            root_size: tree.node_size(root),
            min_cluster_size,
            edges,
        }
    }

    fn stabilities(&self) -> Vec<f64> {
        let mut birth = vec![0.0f64; self.num_clusters];
        for edge in &self.edges {
            if let Child::Cluster(c) = edge.child {
                birth[c] = edge.lambda;
            }
        }
        let mut stability = vec![0.0f64; self.num_clusters];
        for edge in &self.edges {
            stability[edge.parent] += edge.child_size as f64 * (edge.lambda - birth[edge.parent]);
        }
        stability
    }

    /// Excess-of-mass selection. Returns a per-label selection mask.
    fn select(&self, allow_single_cluster: bool) -> Vec<bool> {
        let k = self.num_clusters;
        let mut selected = vec![false; k];
        if k == 0 {
            return selected;
        }

        let stability = self.stabilities();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); k];
        for edge in &self.edges {
            if let Child::Cluster(c) = edge.child {
                children[edge.parent].push(c);
            }
        }

        let mut subtree = vec![0.0f64; k];
        for c in (0..k).rev() {
            let root_blocked = c == 0 && !(allow_single_cluster && self.root_size >= self.min_cluster_size);
            let child_sum: f64 = children[c].iter().map(|&ch| subtree[ch]).sum();
            if root_blocked || (!children[c].is_empty() && child_sum > stability[c]) {
                subtree[c] = child_sum;
            } else {
                subtree[c] = stability[c];
                selected[c] = true;
                deselect_descendants(&children, c, &mut selected);
            }
        }

        // Zero persistence: the cluster never existed over any density range.
        for c in 0..k {
            if selected[c] && stability[c] <= 0.0 {
                selected[c] = false;
            }
        }
        selected
    }

    fn label_points(&self, selected: &[bool]) -> Vec<Option<usize>> {
        let k = self.num_clusters;
        let mut parent_of = vec![usize::MAX; k];
        let mut point_parent = vec![usize::MAX; self.n];
        for edge in &self.edges {
            match edge.child {
                Child::Cluster(c) => parent_of[c] = edge.parent,
                Child::Point(p) => point_parent[p] = edge.parent,
            }
        }

        // Nearest selected ancestor (inclusive) per cluster label; parents precede children.
        let mut owner: Vec<Option<usize>> = vec![None; k];
        for c in 0..k {
            owner[c] = if selected[c] {
                Some(c)
            } else if parent_of[c] != usize::MAX {
                owner[parent_of[c]]
            } else {
                None
            };
        }

        // Dense labels in order of first appearance.
        let mut dense = vec![usize::MAX; k];
        let mut next = 0usize;
        let mut labels = Vec::with_capacity(self.n);
        for &cp in &point_parent {
            let cluster = if cp == usize::MAX { None } else { owner[cp] };
            labels.push(cluster.map(|c| {
                if dense[c] == usize::MAX {
                    dense[c] = next;
                    next += 1;
                }
                dense[c]
            }));
        }
        labels
    }
}

fn deselect_descendants(children: &[Vec<usize>], node: usize, selected: &mut [bool]) {
    let mut stack: Vec<usize> = children[node].clone();
    while let Some(c) = stack.pop() {
        selected[c] = false;
        stack.extend_from_slice(&children[c]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// `m` points at `center + spread * e_k` over distinct axes `k`, so every pair inside
    /// the group sits at exactly `spread * sqrt(2)`.
    fn simplex_group(center: &[f32], m: usize, spread: f32, first_axis: usize) -> Vec<Vec<f32>> {
        (0..m)
            .map(|i| {
                let mut p = center.to_vec();
                p[first_axis + i] += spread;
                p
            })
            .collect()
    }

    fn axis(dim: usize, k: usize, scale: f32) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[k] = scale;
        v
    }

    fn assert_group(labels: &[Option<usize>], range: std::ops::Range<usize>) -> usize {
        let first = labels[range.start].expect("group point should be clustered");
        for i in range {
            assert_eq!(labels[i], Some(first), "point {i} left its group");
        }
        first
    }

    #[test]
    fn two_well_separated_groups() {
        let dim = 24;
        let mut data = simplex_group(&axis(dim, 0, 10.0), 8, 0.5, 2);
        data.extend(simplex_group(&axis(dim, 1, 10.0), 8, 0.5, 12));

        let labels = Hdbscan::new()
            .with_min_samples(3)
            .with_min_cluster_size(4)
            .fit_predict(&data)
            .unwrap();

        assert_eq!(labels.len(), 16);
        let a = assert_group(&labels, 0..8);
        let b = assert_group(&labels, 8..16);
        assert_ne!(a, b);
        assert_eq!(a, 0, "labels are numbered by first appearance");
    }

    #[test]
    fn groups_with_different_densities() {
        let dim = 24;
        let mut data = simplex_group(&axis(dim, 0, 100.0), 8, 0.1, 2);
        data.extend(simplex_group(&axis(dim, 1, 100.0), 8, 3.0, 12));

        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(3)
            .fit_predict(&data)
            .unwrap();

        let dense = assert_group(&labels, 0..8);
        let sparse = assert_group(&labels, 8..16);
        assert_ne!(dense, sparse);
    }

    #[test]
    fn distant_outlier_is_noise() {
        let dim = 24;
        let mut data = simplex_group(&axis(dim, 0, 10.0), 6, 0.2, 3);
        data.extend(simplex_group(&axis(dim, 1, 10.0), 6, 0.2, 10));
        data.push(axis(dim, 2, 500.0));

        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(3)
            .fit_predict(&data)
            .unwrap();

        assert_group(&labels, 0..6);
        assert_group(&labels, 6..12);
        assert_eq!(labels[12], None);
    }

    #[test]
    fn equidistant_points_are_all_noise() {
        let data: Vec<Vec<f32>> = (0..5).map(|k| axis(5, k, 1.0)).collect();
        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(2)
            .fit_predict(&data)
            .unwrap();
        assert!(labels.iter().all(Option::is_none), "got {labels:?}");
    }

    #[test]
    fn single_group_needs_allow_single_cluster() {
        let data = simplex_group(&[0.0; 12], 10, 1.0, 1);
        // Give the group internal structure so the root has positive stability.
        let mut data = data;
        data.push(vec![0.0; 12]);

        let strict = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(6)
            .fit_predict(&data)
            .unwrap();
        assert!(strict.iter().all(Option::is_none));

        let single = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(6)
            .with_allow_single_cluster(true)
            .fit_predict(&data)
            .unwrap();
        let non_noise: HashSet<usize> = single.iter().flatten().copied().collect();
        assert_eq!(non_noise.len(), 1);
    }

    #[test]
    fn duplicate_points_stay_finite() {
        let dim = 8;
        let mut data = vec![axis(dim, 0, 1.0); 4];
        data.extend(vec![axis(dim, 1, 1.0); 4]);
        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(2)
            .fit_predict(&data)
            .unwrap();
        let a = assert_group(&labels, 0..4);
        let b = assert_group(&labels, 4..8);
        assert_ne!(a, b);
    }

    #[test]
    fn all_noise_high_min_cluster_size() {
        let data = vec![vec![0.0, 0.0], vec![10.0, 10.0], vec![20.0, 20.0]];
        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(100)
            .fit_predict(&data)
            .unwrap();
        assert!(labels.iter().all(Option::is_none));
    }

    #[test]
    fn single_point_is_noise() {
        let labels = Hdbscan::new().fit_predict(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(labels, vec![None]);
    }

    #[test]
    fn empty_input() {
        let data: Vec<Vec<f32>> = vec![];
        assert!(matches!(Hdbscan::new().fit_predict(&data), Err(Error::EmptyInput)));
    }

    #[test]
    fn invalid_min_samples_zero() {
        let data = vec![vec![0.0, 0.0]];
        let result = Hdbscan::new().with_min_samples(0).fit_predict(&data);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_min_cluster_size_one() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let result = Hdbscan::new().with_min_cluster_size(1).fit_predict(&data);
        assert!(result.is_err());
    }

    #[test]
    fn non_finite_coordinates_rejected() {
        let data = vec![vec![0.0, f32::NAN], vec![1.0, 1.0]];
        assert!(Hdbscan::new().fit_predict(&data).is_err());
    }

    #[test]
    fn large_min_samples_relative_to_data() {
        let data = simplex_group(&[0.0; 12], 10, 0.5, 1);
        let labels = Hdbscan::new()
            .with_min_samples(100)
            .with_min_cluster_size(3)
            .fit_predict(&data)
            .unwrap();
        assert_eq!(labels.len(), 10);
    }

    #[test]
    fn non_noise_labels_meet_min_cluster_size() {
        let dim = 32;
        let mut data = simplex_group(&axis(dim, 0, 5.0), 9, 0.3, 2);
        data.extend(simplex_group(&axis(dim, 1, 5.0), 7, 0.6, 12));
        data.extend(simplex_group(&axis(dim, 0, 2.0), 3, 1.5, 22));

        let min_cluster_size = 5;
        let labels = Hdbscan::new()
            .with_min_samples(3)
            .with_min_cluster_size(min_cluster_size)
            .fit_predict(&data)
            .unwrap();

        let mut counts = HashMap::new();
        for l in labels.iter().flatten() {
            *counts.entry(*l).or_insert(0usize) += 1;
        }
        for (&label, &count) in &counts {
            assert!(
                count >= min_cluster_size,
                "label {label} has {count} points, expected at least {min_cluster_size}"
            );
        }
    }

    #[test]
    fn cosine_metric_groups_by_direction() {
        // Same directions at very different magnitudes.
        let data = vec![
            vec![1.0, 0.01, 0.0],
            vec![50.0, 0.0, 0.6],
            vec![3.0, 0.05, 0.0],
            vec![0.0, 1.0, 0.01],
            vec![0.0, 40.0, 0.0],
            vec![0.02, 7.0, 0.0],
        ];
        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(3)
            .with_metric(Metric::Cosine)
            .fit_predict(&data)
            .unwrap();
        let a = assert_group(&labels, 0..3);
        let b = assert_group(&labels, 3..6);
        assert_ne!(a, b);
    }

    #[test]
    fn dimension_mismatch() {
        let data = vec![vec![0.0, 0.0], vec![1.0]];
        let result = Hdbscan::new().fit_predict(&data);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }
}
