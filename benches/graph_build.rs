//! Performance benchmarks for graph building and resolution.
//!
//! Run with: `cargo bench --bench graph_build`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Build, 10k records | <20ms | Sort, placement, totals, fingerprint |
//! | Resolve, canonical | <5µs | Strict walk |
//! | Resolve, redirect | <50µs | Handle lookup and scoring |
//! | Page aggregate | <20µs | Breadcrumbs, siblings, subtree view |
//! | Cache lookup | <1µs | Single mutex, LRU touch |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;

use category_graph::{
    CachePolicy, CategoryGraphBuilder, CategoryGraphIndex, CategoryRecord, HierarchyQueries,
    ResponseCache, SlugResolver,
};

/// Create a balanced catalog with `fanout` children per node, four levels
/// below the roots, truncated to `count` records.
fn make_records(count: usize, fanout: usize) -> Vec<CategoryRecord> {
    let mut records = Vec::with_capacity(count);
    let mut frontier: Vec<(String, u32)> = Vec::new();

    for r in 0..fanout.min(count) {
        let id = format!("r{}", r);
        records.push(CategoryRecord::root(id.as_str(), format!("Root {}", r), format!("root-{}", r), r as i64, 1));
        frontier.push((id, 0));
    }

    let mut next = 0;
    while records.len() < count && next < frontier.len() {
        let (parent, depth) = frontier[next].clone();
        next += 1;
        if depth >= 4 {
            continue;
        }
        for c in 0..fanout {
            if records.len() >= count {
                break;
            }
            let id = format!("{}-{}", parent, c);
            records.push(CategoryRecord::child(
                id.as_str(),
                parent.as_str(),
                format!("Category {}", id),
                format!("cat-{}", c),
                depth + 1,
                c as i64,
                (c % 7) as u64,
            ));
            frontier.push((id, depth + 1));
        }
    }
    records
}

fn build(records: &[CategoryRecord]) -> CategoryGraphIndex {
    CategoryGraphBuilder::new().build(records).unwrap()
}

/// Deepest canonical path in the index.
fn deepest_path(index: &CategoryGraphIndex) -> String {
    let node = index.flat().last().unwrap();
    index.full_path(node).unwrap()
}

/// Benchmark full builds at increasing catalog sizes.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for count in [100, 1_000, 10_000] {
        let mut records = make_records(count, 10);
        records.reverse();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("records", count), &records, |b, records| {
            b.iter(|| build(black_box(records)))
        });
    }

    group.finish();
}

/// Benchmark slug resolution, strict walk and redirect.
fn bench_resolve(c: &mut Criterion) {
    let index = build(&make_records(10_000, 10));
    let resolver = SlugResolver::new(&index);
    let canonical = deepest_path(&index);

    // Drop the root segment so the strict walk fails
    let mut segments: Vec<&str> = canonical.split('/').collect();
    segments.remove(0);
    let misplaced = segments.join("/");

    let mut group = c.benchmark_group("resolve");

    group.bench_function("canonical", |b| {
        b.iter(|| {
            let resolution = resolver.resolve_path(black_box(&canonical)).unwrap();
            assert!(resolution.is_valid);
        })
    });

    group.bench_function("redirect", |b| {
        b.iter(|| resolver.resolve_path(black_box(&misplaced)))
    });

    group.bench_function("not_found", |b| {
        b.iter(|| resolver.resolve_path(black_box("root-0/missing/nowhere")))
    });

    group.finish();
}

/// Benchmark page aggregation for a resolved path.
fn bench_page(c: &mut Criterion) {
    let index = build(&make_records(10_000, 10));
    let mut group = c.benchmark_group("page");

    for depth in [0usize, 1, 3] {
        let path: Vec<String> = std::iter::once("root-0".to_string())
            .chain((0..depth).map(|_| "cat-0".to_string()))
            .collect();
        let path = path.join("/");

        group.bench_with_input(BenchmarkId::new("depth", depth), &path, |b, path| {
            let resolver = SlugResolver::new(&index);
            let queries = HierarchyQueries::new(&index);
            b.iter(|| {
                let resolution = resolver.resolve_path(black_box(path)).unwrap();
                queries.page(&resolution).unwrap()
            })
        });
    }

    group.finish();
}

/// Benchmark cached index lookups across threads.
fn bench_cache_contention(c: &mut Criterion) {
    let index = Arc::new(build(&make_records(1_000, 10)));

    let mut group = c.benchmark_group("cache_contention");

    for num_threads in [1, 2, 4, 8] {
        let cache = Arc::new(ResponseCache::new(CachePolicy::default()));
        cache.insert("memory/categories", Arc::clone(&index));

        group.throughput(Throughput::Elements(num_threads as u64 * 100));
        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            &num_threads,
            |b, &n| {
                b.iter(|| {
                    let handles: Vec<_> = (0..n)
                        .map(|_| {
                            let cache = Arc::clone(&cache);
                            thread::spawn(move || {
                                for _ in 0..100 {
                                    let hit = cache.lookup(black_box("memory/categories"));
                                    assert!(hit.is_some());
                                }
                            })
                        })
                        .collect();

                    for h in handles {
                        h.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_resolve,
    bench_page,
    bench_cache_contention,
);
criterion_main!(benches);
