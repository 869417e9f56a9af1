//! Category naming: boilerplate filtering, keyword and phrase scoring, name
//! composition, and merging of near-duplicate names.

pub mod boilerplate;
pub mod generator;
pub mod keywords;
pub mod merger;
pub mod rake;

pub use boilerplate::Boilerplate;
pub use generator::{fallback_name, GeneratedName, NameGenerator, NameSource, NamedCluster};
pub use merger::{keyword_vectors, name_embeddings, FinalCategory, NameMerger};
