use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tempfile::tempdir;
use yarder::{Appender, DiskStorage, Index, LogEntry, MapIndex, SyncPolicy};

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    for &per_chunk in &[10usize, 1_000] {
        group.bench_with_input(
            BenchmarkId::new("disk_os_buffered", per_chunk),
            &per_chunk,
            |b, &per_chunk| {
                b.iter_batched(
                    || tempdir().unwrap(),
                    |dir| {
                        let storage =
                            DiskStorage::new(dir.path()).with_sync(SyncPolicy::OsBuffered);
                        let mut appender = Appender::new(storage, per_chunk);
                        for ts in 0..5_000i64 {
                            let entry = LogEntry::new((ts * 7919) % 5_000, b"{\"msg\":\"x\"}".to_vec());
                            appender.handle_append(entry).unwrap();
                        }
                        appender.flush().unwrap();
                    },
                    BatchSize::PerIteration,
                );
            },
        );
    }
    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let index = MapIndex::new();
    let vocab = ["error", "warn", "info", "disk", "net", "auth", "db", "cache"];
    for i in 0..50_000usize {
        let terms: Vec<&str> = vocab
            .iter()
            .enumerate()
            .filter(|(j, _)| (i >> j) & 1 == 1)
            .map(|(_, t)| *t)
            .collect();
        index.add(format!("doc-{i}"), &terms);
    }

    let mut group = c.benchmark_group("match");
    group.bench_function("one_term", |b| {
        b.iter(|| black_box(index.match_terms(&["error"])))
    });
    group.bench_function("three_terms", |b| {
        b.iter(|| black_box(index.match_terms(&["error", "disk", "db"])))
    });
    group.bench_function("absent_term", |b| {
        b.iter(|| black_box(index.match_terms(&["error", "missing"])))
    });
    group.finish();
}

criterion_group!(benches, bench_append, bench_match);
criterion_main!(benches);
