//! Criterion benchmarks for specdex-core.
//!
//! ## Benchmark groups
//!
//! 1. **schema**: DDL init and version stamp.
//! 2. **parser**: frontmatter, sections, and changelog parsing at several sizes.
//! 3. **markup**: word counting with and without markup.
//! 4. **store**: full rebuild and summary queries.
//!
//! ```sh
//! cargo bench --manifest-path crates/specdex-core/Cargo.toml -- parser
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rusqlite::Connection;

use specdex_core::parser::markup::count_words;
use specdex_core::parser::{parse_changelog, parse_spec};
use specdex_core::query::guards::{clamp_limit, truncate_query, MAX_SEARCH_LIMIT};
use specdex_core::store::schema::init_schema;
use specdex_core::IndexStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A specification with `n` numbered behavior sections, each with a code
/// fence that must not produce headings.
fn synthetic_spec(n: usize) -> String {
    let mut text = String::from("---\ntitle: Bench\nversion: 1.4.0\n---\n\n# Bench\n\n## 1. Vision\n\n");
    text.push_str("A short statement of purpose for the benchmark document.\n\n");
    for i in 0..n {
        let major = 2 + i / 10;
        let minor = i % 10 + 1;
        text.push_str(&format!(
            "### {major}.{minor} Component {i} {{#component-{i}}}\n\n\
             Component {i} accepts **requests** from [callers](https://example.com) and\n\
             stores them in `queue_{i}` until a worker picks them up. Failures are\n\
             retried with backoff and reported once the budget is exhausted.\n\n\
             ```rust\n## not a heading\nfn handle_{i}() {{}}\n```\n\n"
        ));
    }
    text
}

fn synthetic_changelog(n: usize) -> String {
    let mut text = String::from("# Changelog\n\n");
    for i in 0..n {
        text.push_str(&format!(
            "## 2025-01-{:02}T10:00:00Z — /spec:update\n- Revised `#component-{i}` ({}.{})\n\n",
            i % 28 + 1,
            2 + i / 10,
            i % 10 + 1
        ));
    }
    text
}

// ---------------------------------------------------------------------------
// schema
// ---------------------------------------------------------------------------

fn bench_schema_init(c: &mut Criterion) {
    c.bench_function("schema_init", |b| {
        b.iter(|| {
            let conn = Connection::open_in_memory().unwrap();
            init_schema(&conn).unwrap();
            black_box(conn)
        });
    });
}

// ---------------------------------------------------------------------------
// parser
// ---------------------------------------------------------------------------

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    for size in [10usize, 100, 400] {
        let spec = synthetic_spec(size);
        group.bench_with_input(BenchmarkId::new("parse_spec", size), &spec, |b, spec| {
            b.iter(|| parse_spec(black_box(spec)));
        });

        let changelog = synthetic_changelog(size);
        group.bench_with_input(
            BenchmarkId::new("parse_changelog", size),
            &changelog,
            |b, changelog| {
                b.iter(|| parse_changelog(black_box(changelog)));
            },
        );
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// markup
// ---------------------------------------------------------------------------

fn bench_markup(c: &mut Criterion) {
    let mut group = c.benchmark_group("markup");
    let prose = "The widget accepts requests and queues them for later. ".repeat(40);
    let marked = synthetic_spec(5);

    group.bench_function("count_words_prose", |b| {
        b.iter(|| count_words(black_box(&prose)));
    });
    group.bench_function("count_words_markup", |b| {
        b.iter(|| count_words(black_box(&marked)));
    });
    group.bench_function("truncate_query", |b| {
        let long = "x".repeat(2_000);
        b.iter(|| truncate_query(black_box(&long)));
    });
    group.bench_function("clamp_limit", |b| {
        b.iter(|| clamp_limit(black_box(500), black_box(MAX_SEARCH_LIMIT)));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// store
// ---------------------------------------------------------------------------

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    for size in [10usize, 100] {
        let spec = synthetic_spec(size);
        let changelog = synthetic_changelog(size);
        group.bench_with_input(BenchmarkId::new("rebuild", size), &size, |b, _| {
            let mut store = IndexStore::in_memory();
            store.open();
            b.iter(|| {
                store
                    .rebuild(black_box(&spec), Some(black_box(changelog.as_str())), None)
                    .unwrap()
            });
        });
    }

    let mut store = IndexStore::in_memory();
    store.open();
    store
        .rebuild(&synthetic_spec(100), Some(synthetic_changelog(100).as_str()), None)
        .unwrap();
    group.bench_function("readiness_summary", |b| {
        b.iter(|| black_box(store.readiness_summary()));
    });
    group.bench_function("search", |b| {
        b.iter(|| black_box(store.search("worker", 20)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_schema_init,
    bench_parser,
    bench_markup,
    bench_store
);
criterion_main!(benches);
