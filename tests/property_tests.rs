use remark_clusters::cluster::{Agglomerative, Clustering, Hdbscan, Linkage, Metric};
use remark_clusters::{CollaboratorError, Embedder, Pipeline, PipelineConfig};
use proptest::prelude::*;

/// Looks up `points[i]` for the text `"remark i"`.
struct IndexEmbedder {
    points: Vec<Vec<f32>>,
}

impl Embedder for IndexEmbedder {
    fn dimension(&self) -> usize {
        3
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        text.rsplit(' ')
            .next()
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| self.points.get(i).cloned())
            .ok_or_else(|| CollaboratorError::failed(text.to_string()))
    }
}

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("remark {i}")).collect()
}

fn config(cluster_limit: usize, name_limit: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.language.detect = false;
    config.embedding.strip_boilerplate = false;
    config.max_remark_clusters_limit = cluster_limit;
    config.max_name_clusters_limit = name_limit;
    config
}

fn points(max: usize) -> impl Strategy<Value = Vec<Vec<f32>>> {
    prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 3), 1..max)
}

proptest! {
    #[test]
    fn prop_hdbscan_labels_are_dense(
        data in points(30),
        min_cluster_size in 2usize..5,
        min_samples in 1usize..5,
    ) {
        let labels = Hdbscan::new()
            .with_min_cluster_size(min_cluster_size)
            .with_min_samples(min_samples)
            .fit_predict(&data)
            .unwrap();
        prop_assert_eq!(labels.len(), data.len());

        let k = labels.iter().flatten().max().map_or(0, |&m| m + 1);
        for c in 0..k {
            let size = labels.iter().filter(|&&l| l == Some(c)).count();
            prop_assert!(size >= min_cluster_size);
        }
    }

    #[test]
    fn prop_merge_partitions_items(
        data in points(20),
        target in 1usize..6,
    ) {
        let plan = Agglomerative::new(Linkage::Ward)
            .merge_points(&data, Metric::Euclidean, target)
            .unwrap();
        prop_assert_eq!(plan.groups.len(), target.min(data.len()));

        let mut seen: Vec<usize> = plan.groups.iter().flatten().copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..data.len()).collect::<Vec<_>>());
        for w in plan.groups.windows(2) {
            prop_assert!(w[0][0] < w[1][0]);
        }
    }

    #[test]
    fn prop_every_remark_lands_in_one_column(
        data in points(25),
        cluster_limit in 1usize..6,
        name_limit in 1usize..6,
    ) {
        let n = data.len();
        let embedder = IndexEmbedder { points: data };
        let pipeline = Pipeline::new(config(cluster_limit, name_limit), embedder).unwrap();
        let result = pipeline.run_texts(&texts(n)).unwrap();

        prop_assert_eq!(result.table.total_remarks(), n);
        let mut ids: Vec<usize> = result
            .table
            .columns
            .iter()
            .flat_map(|c| c.remark_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        prop_assert_eq!(ids, (0..n).collect::<Vec<_>>());
        prop_assert_eq!(result.assignments.len(), n);

        prop_assert!(result.named_clusters.len() <= cluster_limit);
        prop_assert!(result.table.category_count() <= name_limit);
        prop_assert!(result.table.category_count() <= cluster_limit);
        if result.named_clusters.len() <= name_limit {
            prop_assert_eq!(result.categories.len(), result.named_clusters.len());
            prop_assert!(result.categories.iter().all(|c| !c.is_merged()));
        }
    }

    #[test]
    fn prop_pipeline_is_deterministic(data in points(20)) {
        let n = data.len();
        let pipeline = Pipeline::new(config(3, 2), IndexEmbedder { points: data }).unwrap();
        let a = pipeline.run_texts(&texts(n)).unwrap();
        let b = pipeline.run_texts(&texts(n)).unwrap();
        prop_assert_eq!(a.table, b.table);
        prop_assert_eq!(a.assignments, b.assignments);
    }

    #[test]
    fn prop_larger_threshold_never_uncategorizes_more(
        data in points(25),
        low in 0.0f32..1.0,
        extra in 0.0f32..1.5,
    ) {
        let n = data.len();
        let run = |threshold: f32| {
            let mut cfg = config(4, 4);
            cfg.assign_noise_to_nearest_cluster = true;
            cfg.noise_assignment_distance_threshold = threshold;
            Pipeline::new(cfg, IndexEmbedder { points: data.clone() })
                .unwrap()
                .run_texts(&texts(n))
                .unwrap()
                .uncategorized()
                .count()
        };
        prop_assert!(run(low + extra) <= run(low));
    }
}
