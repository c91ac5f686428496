//! Benchmarks for the flat-file store
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flatstore::query::{Query, QueryExecutor};
use flatstore::storage::{FlatStore, StoreConfig};
use std::collections::HashMap;
use tempfile::tempdir;

fn create_test_input(count: usize) -> String {
    let mut input = String::from("STB|TITLE|PROVIDER|DATE|REV|VIEW_TIME\n");
    for i in 0..count {
        input.push_str(&format!(
            "stb{}|title {}|provider {}|2014-04-{:02}|{}.00|{}:{:02}\n",
            i % 10,
            i,
            i % 3,
            i % 28 + 1,
            i % 20,
            i % 4,
            i % 60
        ));
    }
    input
}

fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");
    group.sample_size(10);

    for size in [100, 1000] {
        let input = create_test_input(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("import_{}", size), |b| {
            let dir = tempdir().unwrap();
            let store = FlatStore::new(StoreConfig::new(dir.path().join("data"))).unwrap();
            b.iter(|| store.import_records(black_box(input.as_bytes()), true).unwrap())
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    group.sample_size(10);

    let dir = tempdir().unwrap();
    let store = FlatStore::new(StoreConfig::new(dir.path().join("data"))).unwrap();
    store
        .import_records(create_test_input(1000).as_bytes(), true)
        .unwrap();

    group.bench_function("scan_key_filter", |b| {
        let mut filters = HashMap::new();
        filters.insert("STB".to_string(), "stb3".to_string());
        b.iter(|| {
            store
                .iter_filtered_records(black_box(&filters))
                .unwrap()
                .count()
        })
    });

    let executor = QueryExecutor::new(store);
    let query = Query::select(&["PROVIDER:count", "REV:sum", "VIEW_TIME:max", "STB:collect"])
        .group_by("PROVIDER")
        .order_by(&["PROVIDER"])
        .build()
        .unwrap();

    group.bench_function("group_aggregate_1000", |b| {
        b.iter(|| executor.query_to_string(black_box(&query)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_import, bench_query);
criterion_main!(benches);
