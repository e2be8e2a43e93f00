//! Selector and cache reducer benchmarks

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cachet_core::cache::{Cache, CacheAction, CacheDefinition, Limiter};
use cachet_core::select::{by_value, create_async_selector, AsyncSelector};

#[derive(Default)]
struct AppState {
    width: u32,
    height: u32,
}

type State = Arc<AppState>;
type Words = Cache<String, usize, ()>;

fn area() -> AsyncSelector<State, (), (), u32> {
    create_async_selector(
        (|state: &State, _: &()| state.width, |state: &State, _: &()| state.height),
        |(width, height): (u32, u32)| width * height,
    )
}

fn bench_composed_selector(c: &mut Criterion) {
    let mut group = c.benchmark_group("composed_selector");
    let selector = area();

    let state = Arc::new(AppState { width: 3, height: 4 });
    group.bench_function("same_snapshot", |b| b.iter(|| black_box(selector.select(&state, &()))));

    // A new snapshot with equal inputs reruns the inputs only.
    group.bench_function("equal_inputs", |b| {
        b.iter(|| {
            let state = Arc::new(AppState { width: 3, height: 4 });
            black_box(selector.select(&state, &()))
        })
    });

    let mut width = 0;
    group.bench_function("changed_inputs", |b| {
        b.iter(|| {
            width += 1;
            let state = Arc::new(AppState { width, height: 4 });
            black_box(selector.select(&state, &()))
        })
    });

    group.finish();
}

fn bench_cache_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_reduce");

    for capacity in [5, 50, 500] {
        let words: CacheDefinition<Words, String, usize, ()> =
            CacheDefinition::new("words", |cache: &Words| cache, by_value::<String>, Limiter::newest(capacity).unwrap());
        let full = (0..capacity).fold(Words::new(), |cache, n| {
            words.reduce(&cache, &words.await_value(format!("w{n}"), format!("request-{n}").into(), ()))
        });

        let receive = words.receive_value("request-0".into(), 1);
        group.bench_with_input(BenchmarkId::new("receive_oldest", capacity), &full, |b, cache| {
            b.iter(|| black_box(words.reduce(cache, &receive)))
        });

        let evicting = words.await_value("new".to_string(), "request-new".into(), ());
        group.bench_with_input(BenchmarkId::new("await_evicting", capacity), &full, |b, cache| {
            b.iter(|| black_box(words.reduce(cache, &evicting)))
        });

        let other: CacheAction<String, usize, ()> = CacheAction::Receive {
            cache_id: "other".into(),
            request_id: "request-0".into(),
            value: 1,
        };
        group.bench_with_input(BenchmarkId::new("other_cache", capacity), &full, |b, cache| {
            b.iter(|| black_box(words.reduce(cache, &other)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_composed_selector, bench_cache_reduce);
criterion_main!(benches);
