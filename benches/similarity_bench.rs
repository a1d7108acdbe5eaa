//! Similarity scoring and ranking benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::runtime::Runtime;

use civ_atlas::core::config::{AtlasConfig, MissingAttributePolicy};
use civ_atlas::schema::SchemaRegistry;
use civ_atlas::seed::{generate_drafts, random_attributes};
use civ_atlas::similarity::SimilarityScorer;
use civ_atlas::Atlas;

fn bench_pairwise_score(c: &mut Criterion) {
    let registry = SchemaRegistry::builtin();
    let scorer = SimilarityScorer::new(&registry, MissingAttributePolicy::MaxDistance);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let a = random_attributes(&mut rng);
    let b = random_attributes(&mut rng);

    c.bench_function("score_pair", |bench| {
        bench.iter(|| scorer.score(black_box(&a), black_box(&b)))
    });
}

fn bench_find_similar(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("find_similar");

    for &population in &[100usize, 1_000, 5_000] {
        let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
        let target = rt.block_on(async {
            let mut first = None;
            for draft in generate_drafts(population as u64, population) {
                let record = atlas.civilizations().create(&draft).await.unwrap();
                first.get_or_insert(record.id);
            }
            first.unwrap()
        });

        group.bench_with_input(BenchmarkId::from_parameter(population), &population, |bench, _| {
            bench.iter(|| {
                rt.block_on(atlas.similarity().find_similar(black_box(target), 10, Some(0.0)))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pairwise_score, bench_find_similar);
criterion_main!(benches);
