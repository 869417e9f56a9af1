use crate::error::Result;

/// Common interface for hard clustering algorithms that may leave points unassigned.
pub trait Clustering {
    /// Fit the model and return one label per input point.
    ///
    /// `None` marks a noise point: the algorithm declined to place it in any cluster.
    /// Labels are dense (`0..k`) and numbered in order of first appearance.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>>;

    /// Short algorithm name, used in logs.
    fn name(&self) -> &'static str;
}
