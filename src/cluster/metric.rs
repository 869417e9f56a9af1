use serde::{Deserialize, Serialize};

use super::util;

/// Distance function over embedding vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Straight-line distance.
    #[default]
    Euclidean,
    /// `1 - cos(a, b)`, in `[0, 2]`. A zero vector is at distance 1 from everything.
    Cosine,
}

impl Metric {
    /// Distance between `a` and `b`. Both slices must have the same length.
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Euclidean => util::squared_euclidean(a, b).sqrt(),
            Metric::Cosine => {
                let na = util::norm(a);
                let nb = util::norm(b);
                if na == 0.0 || nb == 0.0 {
                    return 1.0;
                }
                let cos = util::dot(a, b) / (na * nb);
                (1.0 - cos).clamp(0.0, 2.0)
            }
        }
    }

    /// Lowercase name, matching the configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Cosine => "cosine",
        }
    }
}
