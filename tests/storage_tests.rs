// Chunk storage tests
// Tests for appending, closing, and reading back disk-backed chunks.

use std::fs;

use rand::Rng;
use tempfile::tempdir;
use yarder::storage::reader::ChunkReader;
use yarder::{ChunkId, DiskStorage, Error, LogChunk, LogEntry, Options, Storage, SyncPolicy};

fn storage_in(dir: &std::path::Path) -> DiskStorage {
    DiskStorage::new(dir).with_sync(SyncPolicy::OsBuffered)
}

// =============================================================================
// Test 1: Size counts every successful append
// =============================================================================
#[test]
fn size_counts_appends() {
    let dir = tempdir().unwrap();
    let mut storage = storage_in(dir.path());
    let mut chunk = storage.create_chunk().unwrap();

    chunk.append(LogEntry::new(6, "")).unwrap();
    chunk.append(LogEntry::new(4, "")).unwrap();
    chunk.append(LogEntry::new(5, "")).unwrap();

    assert_eq!(chunk.size(), 3);
}

// =============================================================================
// Test 2: Closing sorts entries by timestamp before writing
// =============================================================================
#[test]
fn close_sorts_entries() {
    let dir = tempdir().unwrap();
    let mut storage = storage_in(dir.path());
    let mut chunk = storage.create_chunk().unwrap();

    chunk.append(LogEntry::new(6, "")).unwrap();
    chunk.append(LogEntry::new(4, "")).unwrap();
    chunk.append(LogEntry::new(5, "")).unwrap();
    chunk.close().unwrap();

    // Exactly one file in the root, holding the sorted entries
    let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);

    let reader = ChunkReader::open(&storage.chunk_path(chunk.id())).unwrap();
    let ts: Vec<i64> = reader.entries().iter().map(|e| e.timestamp_ms).collect();
    assert_eq!(ts, vec![4, 5, 6]);
}

// =============================================================================
// Test 3: Random timestamps come back sorted, ties in append order
// =============================================================================
#[test]
fn random_timestamps_sorted_and_stable() {
    let dir = tempdir().unwrap();
    let mut storage = storage_in(dir.path());
    let mut chunk = storage.create_chunk().unwrap();
    let mut rng = rand::thread_rng();

    // Narrow range forces plenty of ties; raw carries the append position
    for i in 0..500u32 {
        let ts = rng.gen_range(-20..20);
        chunk.append(LogEntry::new(ts, i.to_le_bytes().to_vec())).unwrap();
    }
    chunk.close().unwrap();

    let entries = storage.read_chunk(chunk.id()).unwrap();
    assert_eq!(entries.len(), 500);
    for pair in entries.windows(2) {
        assert!(pair[0].timestamp_ms <= pair[1].timestamp_ms);
        if pair[0].timestamp_ms == pair[1].timestamp_ms {
            let a = u32::from_le_bytes(pair[0].raw.clone().try_into().unwrap());
            let b = u32::from_le_bytes(pair[1].raw.clone().try_into().unwrap());
            assert!(a < b, "tie at {} reordered", pair[0].timestamp_ms);
        }
    }
}

// =============================================================================
// Test 4: Second close fails and does not touch the file
// =============================================================================
#[test]
fn double_close_is_refused() {
    let dir = tempdir().unwrap();
    let mut storage = storage_in(dir.path());
    let mut chunk = storage.create_chunk().unwrap();
    chunk.append(LogEntry::new(1, "only")).unwrap();
    chunk.close().unwrap();

    let before = fs::read(chunk.path()).unwrap();
    let err = chunk.close().unwrap_err();
    assert!(matches!(err, Error::AlreadyClosed(ChunkId(0))));
    assert_eq!(fs::read(chunk.path()).unwrap(), before);
    assert!(chunk.is_closed());
    assert_eq!(chunk.size(), 1);
}

// =============================================================================
// Test 5: Append after close is refused
// =============================================================================
#[test]
fn append_after_close_is_refused() {
    let dir = tempdir().unwrap();
    let mut storage = storage_in(dir.path());
    let mut chunk = storage.create_chunk().unwrap();
    chunk.close().unwrap();

    let err = chunk.append(LogEntry::new(1, "late")).unwrap_err();
    assert!(matches!(err, Error::AlreadyClosed(_)));
    assert_eq!(chunk.size(), 0);
}

// =============================================================================
// Test 6: A failed close keeps the chunk open and can be retried
// =============================================================================
#[test]
fn failed_close_keeps_entries_for_retry() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();

    let mut storage = storage_in(&root);
    let mut chunk = storage.create_chunk().unwrap();
    chunk.append(LogEntry::new(2, "b")).unwrap();
    chunk.append(LogEntry::new(1, "a")).unwrap();

    // Pull the directory out from under the chunk
    fs::remove_dir(&root).unwrap();
    let err = chunk.close().unwrap_err();
    assert!(matches!(err, Error::Write { chunk: ChunkId(0), .. }));
    assert!(!chunk.is_closed());
    assert_eq!(chunk.size(), 2);

    // Still appendable, and the retry publishes everything
    chunk.append(LogEntry::new(0, "c")).unwrap();
    fs::create_dir(&root).unwrap();
    chunk.close().unwrap();

    let raws: Vec<Vec<u8>> = storage
        .read_chunk(ChunkId(0))
        .unwrap()
        .into_iter()
        .map(|e| e.raw)
        .collect();
    assert_eq!(raws, vec![b"c".to_vec(), b"a".to_vec(), b"b".to_vec()]);
}

// =============================================================================
// Test 7: Existing chunk file blocks allocation of that id
// =============================================================================
#[test]
fn existing_file_blocks_allocation() {
    let dir = tempdir().unwrap();
    let mut storage = storage_in(dir.path());
    fs::write(storage.chunk_path(ChunkId(0)), b"someone else's").unwrap();

    let err = storage.create_chunk().unwrap_err();
    assert!(matches!(err, Error::Allocation { chunk: ChunkId(0), .. }));
    assert_eq!(fs::read(storage.chunk_path(ChunkId(0))).unwrap(), b"someone else's");

    // Next id is free
    assert_eq!(storage.create_chunk().unwrap().id(), ChunkId(1));
}

// =============================================================================
// Test 8: Reopening a root resumes after the last persisted chunk
// =============================================================================
#[test]
fn open_resumes_chunk_ids() {
    let dir = tempdir().unwrap();
    let opts = Options {
        sync: SyncPolicy::OsBuffered,
        ..Options::default()
    };

    {
        let mut storage = DiskStorage::open(dir.path(), &opts).unwrap();
        for _ in 0..3 {
            let mut chunk = storage.create_chunk().unwrap();
            chunk.append(LogEntry::new(1, "x")).unwrap();
            chunk.close().unwrap();
        }
    }

    let mut storage = DiskStorage::open(dir.path(), &opts).unwrap();
    assert_eq!(
        storage.list_chunks().unwrap(),
        vec![ChunkId(0), ChunkId(1), ChunkId(2)]
    );
    assert_eq!(storage.create_chunk().unwrap().id(), ChunkId(3));
}

// =============================================================================
// Test 9: Open creates a missing root
// =============================================================================
#[test]
fn open_creates_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("a").join("b");
    let mut storage = DiskStorage::open(&root, &Options::default()).unwrap();
    assert!(root.is_dir());
    assert_eq!(storage.create_chunk().unwrap().id(), ChunkId(0));
}

// =============================================================================
// Test 10: Corrupted chunk file is reported, not half-read
// =============================================================================
#[test]
fn corrupted_chunk_file_detected() {
    let dir = tempdir().unwrap();
    let mut storage = storage_in(dir.path());
    let mut chunk = storage.create_chunk().unwrap();
    chunk.append(LogEntry::new(1, "payload")).unwrap();
    chunk.close().unwrap();

    let path = storage.chunk_path(ChunkId(0));
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        storage.read_chunk(ChunkId(0)),
        Err(Error::Deserialization(_))
    ));
}

// =============================================================================
// Test 11: Temp files never show up as chunks
// =============================================================================
#[test]
fn list_ignores_foreign_files() {
    let dir = tempdir().unwrap();
    let storage = storage_in(dir.path());
    fs::write(dir.path().join(".yarder-abc.tmp"), b"").unwrap();
    fs::write(dir.path().join("README"), b"").unwrap();
    assert!(storage.list_chunks().unwrap().is_empty());
}
