use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use remark_clusters::cluster::{Agglomerative, Clustering, Hdbscan, Linkage, Metric};
use remark_clusters::{HashingEmbedder, Pipeline, PipelineConfig};

fn blobs(rng: &mut StdRng, n: usize, d: usize, centers: usize) -> Vec<Vec<f32>> {
    let centers: Vec<Vec<f32>> = (0..centers)
        .map(|_| (0..d).map(|_| rng.random::<f32>() * 10.0).collect())
        .collect();
    (0..n)
        .map(|i| {
            centers[i % centers.len()]
                .iter()
                .map(|c| c + rng.random::<f32>() * 0.5)
                .collect()
        })
        .collect()
}

fn bench_hdbscan(c: &mut Criterion) {
    let mut group = c.benchmark_group("hdbscan");
    let mut rng = StdRng::seed_from_u64(42);
    let data = blobs(&mut rng, 500, 16, 8);

    group.bench_function("fit_predict_n500_d16", |b| {
        b.iter(|| {
            let model = Hdbscan::new().with_min_samples(2).with_min_cluster_size(2);
            model.fit_predict(black_box(&data)).unwrap();
        })
    });
    group.finish();
}

fn bench_agglomerative(c: &mut Criterion) {
    let mut group = c.benchmark_group("agglomerative");
    let mut rng = StdRng::seed_from_u64(7);
    let centroids = blobs(&mut rng, 100, 16, 20);

    for linkage in [Linkage::Ward, Linkage::Average] {
        group.bench_function(format!("merge_{}_n100_to10", linkage.as_str()), |b| {
            b.iter(|| {
                Agglomerative::new(linkage)
                    .merge_points(black_box(&centroids), Metric::Euclidean, 10)
                    .unwrap();
            })
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let mut rng = StdRng::seed_from_u64(3);
    let topics = [
        ["meter", "display", "blank", "reading"],
        ["bill", "amount", "high", "charged"],
        ["power", "outage", "street", "supply"],
        ["transformer", "sparking", "pole", "wire"],
    ];
    let texts: Vec<String> = (0..300)
        .map(|i| {
            let words = &topics[i % topics.len()];
            (0..6)
                .map(|_| words[rng.random_range(0..words.len())])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let mut config = PipelineConfig::default();
    config.language.detect = false;
    let pipeline = Pipeline::new(config, HashingEmbedder::default()).unwrap();
    group.sample_size(10);
    group.bench_function("run_texts_n300", |b| {
        b.iter(|| pipeline.run_texts(black_box(&texts)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_hdbscan, bench_agglomerative, bench_pipeline);
criterion_main!(benches);
