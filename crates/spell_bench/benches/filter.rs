use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spell_core::{BloomFilter, FilterParams, Layout, Membership, RefreshController};

fn words(n: usize, len: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..len).map(|_| rng.sample(Alphanumeric) as char).collect())
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let dict = words(100_000, 8, 1);
    let misses = words(10_000, 11, 2);
    let params = FilterParams::new(100_000, 0.01);

    c.bench_function("bulk_add_100k", |b| {
        b.iter_batched(
            || BloomFilter::new(params).unwrap(),
            |mut f| black_box(f.bulk_add(&dict)),
            BatchSize::LargeInput,
        )
    });

    let mut full = BloomFilter::new(params).unwrap();
    full.bulk_add(&dict);
    c.bench_function("contains_hit", |b| {
        b.iter(|| black_box(dict[..10_000].iter().filter(|w| full.contains(w)).count()))
    });
    c.bench_function("contains_miss", |b| {
        b.iter(|| black_box(misses.iter().filter(|w| full.contains(w)).count()))
    });

    let mut counting = BloomFilter::new(params.layout(Layout::Counters)).unwrap();
    counting.bulk_add(&dict);
    c.bench_function("contains_hit_counters", |b| {
        b.iter(|| black_box(dict[..10_000].iter().filter(|w| counting.contains(w)).count()))
    });

    c.bench_function("grow_from_1k_to_100k", |b| {
        b.iter_batched(
            || RefreshController::new(FilterParams::new(1_000, 0.01)).unwrap(),
            |mut ctl| {
                for w in &dict {
                    ctl.add(w).unwrap();
                }
                black_box(ctl.rebuild_count())
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_filter);
criterion_main!(benches);
