use async_trait::async_trait;
use cardcast_deck_gateway::application::DeckCache;
use cardcast_deck_gateway::domain::{Card, Deck, DeckAuthor, DeckCards, DeckError, DeckInfo, DeckSource};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

/// In-memory source so the benchmarks measure the cache, not the network
struct StaticSource;

#[async_trait]
impl DeckSource for StaticSource {
    async fn fetch_deck(&self, code: &str) -> Result<Deck, DeckError> {
        let card = |id: &str| Card {
            id: id.to_string(),
            text: vec!["Bench card".to_string()],
            created_at: None,
            nsfw: false,
        };
        let cards = DeckCards {
            calls: (0..50).map(|i| card(&format!("c{}", i))).collect(),
            responses: (0..200).map(|i| card(&format!("r{}", i))).collect(),
        };
        let info = DeckInfo {
            name: "Bench Deck".to_string(),
            code: code.to_uppercase(),
            description: None,
            created_at: None,
            updated_at: None,
            copyright_holder_url: None,
            category: None,
            unlisted: false,
            external_copyright: false,
            call_count: 50,
            response_count: 200,
            rating: 0.0,
            author: Some(DeckAuthor {
                id: "bench".to_string(),
                username: "bench".to_string(),
            }),
        };
        Ok(Deck::from_parts(cards, info))
    }
}

/// Benchmark play code normalization (runs on every lookup)
fn benchmark_code_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("code_normalization");

    group.bench_function("normalize_lowercase", |b| {
        b.iter(|| {
            black_box(DeckCache::normalize_code("abc12"));
        });
    });

    group.bench_function("normalize_padded_mixed_case", |b| {
        b.iter(|| {
            black_box(DeckCache::normalize_code("  AbC12\t"));
        });
    });

    group.finish();
}

/// Benchmark lookups against a warm cache
fn benchmark_cache_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_lookups");
    let rt = tokio::runtime::Runtime::new().unwrap();

    let cache = DeckCache::new(Arc::new(StaticSource), 3600.0);
    rt.block_on(async {
        for i in 0..100 {
            cache.get_deck(&format!("deck{}", i)).await.unwrap();
        }
    });

    group.bench_function("fresh_hit", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(cache.get_deck("deck42").await.unwrap());
        });
    });

    group.bench_function("fresh_hit_unnormalized", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(cache.get_deck("  DECK42 ").await.unwrap());
        });
    });

    group.bench_function("stats", |b| {
        b.iter(|| {
            black_box(cache.stats());
        });
    });

    group.finish();
}

/// Benchmark the miss path with caching disabled
fn benchmark_uncached_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncached_fetch");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = DeckCache::new(Arc::new(StaticSource), 0.0);

    group.bench_function("fetch_and_store", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(cache.get_deck("abc12").await.unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_code_normalization,
    benchmark_cache_lookups,
    benchmark_uncached_fetch
);
criterion_main!(benches);
