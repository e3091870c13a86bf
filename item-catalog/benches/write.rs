use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use item_catalog::{model::ItemDraft, CatalogStore};

const CATEGORIES: [&str; 3] = ["Soccer", "Hockey", "Skating"];

fn benchmark_item_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_item_writes");
    group.sample_size(10);
    for items in [10_u64, 100_u64, 250_u64, 1000_u64].iter() {
        group.throughput(Throughput::Elements(*items));
        group.bench_with_input(BenchmarkId::from_parameter(items), items, |b, &items| {
            b.iter_custom(|rounds| {
                let mut total = Duration::ZERO;
                for _ in 0..rounds {
                    let store = CatalogStore::in_memory().unwrap();
                    store.ensure_categories(CATEGORIES).unwrap();

                    let start = Instant::now();
                    for i in 0..items {
                        let draft = ItemDraft {
                            name: format!("item {i}"),
                            description: "benchmark item".to_string(),
                            category: CATEGORIES[i as usize % CATEGORIES.len()].to_string(),
                        };
                        store.create_item(draft).unwrap();
                    }
                    total += start.elapsed();
                }
                total
            });
        });
    }
}

criterion_group!(benches, benchmark_item_writes);
criterion_main!(benches);
