//! Clustering algorithms for grouping embedding vectors.
//!
//! Two algorithms cover the pipeline's needs:
//!
//! ## HDBSCAN
//!
//! Density-based clustering that discovers a data-dependent number of clusters and
//! leaves points in sparse regions unlabeled (noise), rather than forcing every point
//! into a group. No global distance threshold is needed: clusters are extracted from
//! a hierarchy by stability.
//!
//! ## Agglomerative merging
//!
//! Repeatedly merges the closest pair of groups until a fixed count remains. It is
//! used twice, with the same deterministic tie-break: once over cluster centroids to
//! cap the number of clusters, and once over category-name vectors to cap the number
//! of output columns.
//!
//! ## Usage
//!
//! ```rust
//! use remark_clusters::cluster::{Agglomerative, Clustering, Hdbscan, Linkage, Metric};
//!
//! let data = vec![
//!     vec![0.0, 0.0, 0.0, 0.0],
//!     vec![0.0, 0.1, 0.0, 0.0],
//!     vec![0.0, 0.0, 0.1, 0.0],
//!     vec![10.0, 0.0, 0.0, 0.0],
//!     vec![10.0, 0.1, 0.0, 0.0],
//!     vec![10.0, 0.0, 0.1, 0.0],
//! ];
//!
//! // Density-based clustering (noise as `None`).
//! let labels = Hdbscan::new()
//!     .with_min_samples(2)
//!     .with_min_cluster_size(3)
//!     .fit_predict(&data)
//!     .unwrap();
//! assert_eq!(labels.len(), data.len());
//!
//! // Hierarchical merge down to one group.
//! let plan = Agglomerative::new(Linkage::Ward)
//!     .merge_points(&data, Metric::Euclidean, 1)
//!     .unwrap();
//! assert_eq!(plan.groups.len(), 1);
//! ```

mod agglomerative;
mod hdbscan;
mod metric;
mod traits;
pub(crate) mod util;

pub use agglomerative::{Agglomerative, Linkage, MergePlan, MergeStep};
pub use hdbscan::Hdbscan;
pub use metric::Metric;
pub use traits::Clustering;
