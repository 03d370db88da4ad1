//! Similarity search over the SQLite context store.
//!
//! Uses 2,000 legacy rows of 384 dimensions by default. Set
//! `BENCH_FULL_SCALE=1` to run against 20,000 rows:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p ghostwriter-storage
//! ```

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use ghostwriter_core::Timestamp;
use ghostwriter_storage::{Database, SqliteContextStore};

const CI_ROW_COUNT: usize = 2_000;
const FULL_SCALE_ROW_COUNT: usize = 20_000;
const DIMENSIONS: usize = 384;

fn row_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_ROW_COUNT
    } else {
        CI_ROW_COUNT
    }
}

/// Deterministic pseudo-random unit vector for row `seed`.
fn vector(seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut v: Vec<f32> = (0..DIMENSIONS)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0
        })
        .collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

fn build_populated_db(count: usize) -> Database {
    let db = Database::in_memory().expect("open db");
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO context_rows (table_name, user_id, sender_key, content, timestamp, embedding)
                 VALUES ('legacy_messages', 'u1', ?1, ?2, ?3, ?4)",
            )?;
            for i in 0..count {
                let blob = ghostwriter_storage::vector::encode_embedding(&vector(i as u64));
                stmt.execute(rusqlite::params![
                    format!("sender-{}", i % 17),
                    format!("legacy message number {}", i),
                    Timestamp(i as i64).0,
                    blob
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    })
    .expect("seed rows");
    db
}

fn bench_similarity_search(c: &mut Criterion) {
    let count = row_count();
    let db = build_populated_db(count);
    let query = vector(u64::MAX / 3);

    let mut group = c.benchmark_group("similarity_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("strict_top5_{}rows", count), |b| {
        b.iter(|| {
            SqliteContextStore::scan_similar(&db, "legacy_messages", &query, "u1", 5, 0.7)
                .expect("search failed")
        });
    });

    group.bench_function(format!("loose_top20_{}rows", count), |b| {
        b.iter(|| {
            SqliteContextStore::scan_similar(&db, "legacy_messages", &query, "u1", 20, 0.0)
                .expect("search failed")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_similarity_search);
criterion_main!(benches);
