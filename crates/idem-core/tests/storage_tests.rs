use idem_core::storage::models::*;
use idem_core::storage::Database;

fn make_test_file(db: &Database, path: &str, dir_id: i64, size: i64, hash: &str) -> FileMetadata {
    let hash_id = db.intern_hash(hash, size).unwrap();
    FileMetadata {
        path: path.to_string(),
        dir_id,
        size,
        mtime_ns: 1_700_000_000_000_000_000,
        inode: 42,
        device: 7,
        hash_id,
    }
}

fn dir_id(db: &Database, path: &str) -> i64 {
    db.insert_directory(path).unwrap();
    db.get_directory(path).unwrap().unwrap().id
}

#[test]
fn test_intern_hash_returns_same_id() {
    let db = Database::open_in_memory().unwrap();

    let first = db.intern_hash("aaaa", 10).unwrap();
    for _ in 0..5 {
        assert_eq!(db.intern_hash("aaaa", 10).unwrap(), first);
    }
    let other = db.intern_hash("bbbb", 10).unwrap();
    assert_ne!(first, other);

    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM hashes WHERE hash = 'aaaa'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(db.get_hash(first).unwrap().unwrap().size, 10);
}

#[test]
fn test_upsert_file_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let dir = dir_id(&db, "/data");
    let meta = make_test_file(&db, "/data/a.txt", dir, 100, "h1");

    assert_eq!(db.upsert_file(&meta).unwrap(), 1);
    let record = db.get_file("/data/a.txt").unwrap().unwrap();
    let changes = db.total_changes().unwrap();

    assert_eq!(db.upsert_file(&meta).unwrap(), 0);
    assert_eq!(db.total_changes().unwrap(), changes);
    assert_eq!(db.get_file("/data/a.txt").unwrap().unwrap(), record);
}

#[test]
fn test_upsert_file_updates_on_change() {
    let db = Database::open_in_memory().unwrap();
    let dir = dir_id(&db, "/data");
    let meta = make_test_file(&db, "/data/a.txt", dir, 100, "h1");
    db.upsert_file(&meta).unwrap();
    let id = db.get_file("/data/a.txt").unwrap().unwrap().id;

    let changed = FileMetadata {
        mtime_ns: meta.mtime_ns + 1,
        ..meta.clone()
    };
    assert_eq!(db.upsert_file(&changed).unwrap(), 1);

    let rehashed = make_test_file(&db, "/data/a.txt", dir, 120, "h2");
    assert_eq!(db.upsert_file(&rehashed).unwrap(), 1);

    let record = db.get_file("/data/a.txt").unwrap().unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.size, 120);
    assert_eq!(record.hash_id, rehashed.hash_id);
}

#[test]
fn test_upsert_rejects_unknown_hash() {
    let db = Database::open_in_memory().unwrap();
    let dir = dir_id(&db, "/data");
    let meta = FileMetadata {
        path: "/data/x".to_string(),
        dir_id: dir,
        size: 1,
        mtime_ns: 0,
        inode: 0,
        device: 0,
        hash_id: 9999,
    };
    assert!(db.upsert_file(&meta).is_err());
}

#[test]
fn test_directory_queue_is_fifo() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.next_pending_directory().unwrap().is_none());

    assert_eq!(db.insert_directory("/b").unwrap(), 1);
    assert_eq!(db.insert_directory("/a").unwrap(), 1);
    assert_eq!(db.insert_directory("/b").unwrap(), 0);

    let first = db.next_pending_directory().unwrap().unwrap();
    assert_eq!(first.path, "/b");
    assert_eq!(first.status, DirStatus::Pending);

    db.mark_directory_indexing(first.id).unwrap();
    let second = db.next_pending_directory().unwrap().unwrap();
    assert_eq!(second.path, "/a");

    db.mark_directory_done(first.id, 123).unwrap();
    let done = db.get_directory("/b").unwrap().unwrap();
    assert_eq!(done.status, DirStatus::Done);
    assert_eq!(done.last_seen, Some(123));
}

#[test]
fn test_reset_in_flight_directories() {
    let db = Database::open_in_memory().unwrap();
    let a = dir_id(&db, "/a");
    let b = dir_id(&db, "/b");
    dir_id(&db, "/c");
    db.mark_directory_indexing(a).unwrap();
    db.mark_directory_indexing(b).unwrap();
    db.mark_directory_done(b, 5).unwrap();

    assert_eq!(db.reset_in_flight_directories().unwrap(), 1);
    let statuses: Vec<DirStatus> = db
        .list_directories()
        .unwrap()
        .into_iter()
        .map(|d| d.status)
        .collect();
    assert_eq!(
        statuses,
        vec![DirStatus::Pending, DirStatus::Done, DirStatus::Pending]
    );
}

#[test]
fn test_mark_files_seen_only_touches_listed_paths() {
    let db = Database::open_in_memory().unwrap();
    let dir = dir_id(&db, "/d");
    for path in ["/d/a", "/d/b"] {
        let meta = make_test_file(&db, path, dir, 10, path);
        db.upsert_file(&meta).unwrap();
    }

    assert_eq!(db.mark_files_seen(dir, &["/d/a", "/d/missing"], 77).unwrap(), 1);
    assert_eq!(db.get_file("/d/a").unwrap().unwrap().last_seen, Some(77));
    assert_eq!(db.get_file("/d/b").unwrap().unwrap().last_seen, None);
}

#[test]
fn test_duplicate_groups_ordered_by_waste() {
    let db = Database::open_in_memory().unwrap();
    let dir = dir_id(&db, "/s");
    let files = [
        ("/s/a", 500, "big"),
        ("/s/b", 500, "big"),
        ("/s/c", 200, "small"),
        ("/s/d", 200, "small"),
        ("/s/e", 200, "small"),
        ("/s/f", 900, "unique"),
    ];
    for (path, size, hash) in files {
        let meta = make_test_file(&db, path, dir, size, hash);
        db.upsert_file(&meta).unwrap();
    }

    let groups = db.duplicate_groups(0, 10).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].hash, "big");
    assert_eq!(groups[0].wasted_bytes, 500);
    assert_eq!(groups[1].hash, "small");
    assert_eq!(groups[1].file_count, 3);
    assert_eq!(groups[1].wasted_bytes, 400);
    assert!(!groups[0].unresolved);

    let members = db.files_for_hash(groups[1].hash_id).unwrap();
    let paths: Vec<&str> = members.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["/s/c", "/s/d", "/s/e"]);

    assert_eq!(db.duplicate_groups(1, 10).unwrap().len(), 1);
}

#[test]
fn test_status_snapshot_counts() {
    let db = Database::open_in_memory().unwrap();
    let dir = dir_id(&db, "/s");
    dir_id(&db, "/s/pending");

    let files = [
        ("/s/a", 10, "dup"),
        ("/s/b", 10, "dup"),
        ("/s/c", 5, "mixed"),
        ("/s/d", 6, "mixed"),
        ("/s/e", 3, "unique"),
    ];
    for (path, size, hash) in files {
        let meta = FileMetadata {
            size,
            ..make_test_file(&db, path, dir, size, hash)
        };
        db.upsert_file(&meta).unwrap();
    }
    db.mark_files_seen(dir, &["/s/a", "/s/b", "/s/c", "/s/d"], 100).unwrap();
    db.mark_directory_done(dir, 100).unwrap();

    let s = db.status_snapshot().unwrap();
    assert_eq!(s.total_dirs, 2);
    assert_eq!(s.pending_dirs, 1);
    assert_eq!(s.done_dirs, 1);
    assert_eq!(s.indexing_dirs, 0);
    assert!(!s.indexing_in_progress);
    assert_eq!(s.last_completed_scan, Some(100));

    assert_eq!(s.total_files, 5);
    assert_eq!(s.total_bytes, 34);
    assert_eq!(s.files_seen_last_scan, 4);
    assert_eq!(s.stale_files, 1);

    assert_eq!(s.unique_hashes, 3);
    assert_eq!(s.duplicate_groups, 2);
    assert_eq!(s.duplicate_files, 4);
    assert_eq!(s.unresolved_groups, 1);
    assert_eq!(s.unresolved_files, 2);

    assert_eq!(s.orphaned_files, 0);
    assert_eq!(s.orphaned_hashes, 0);
}

#[test]
fn test_status_snapshot_on_empty_store() {
    let db = Database::open_in_memory().unwrap();
    let s = db.status_snapshot().unwrap();
    assert_eq!(s, StatusSnapshot::default());
}

#[test]
fn test_status_snapshot_detects_integrity_violations() {
    let db = Database::open_in_memory().unwrap();
    let dir = dir_id(&db, "/s");
    db.intern_hash("unreferenced", 1).unwrap();

    db.connection()
        .execute_batch("PRAGMA foreign_keys = OFF;")
        .unwrap();
    let meta = make_test_file(&db, "/s/orphan", dir + 100, 1, "h");
    db.upsert_file(&meta).unwrap();
    db.connection()
        .execute_batch("PRAGMA foreign_keys = ON;")
        .unwrap();

    let s = db.status_snapshot().unwrap();
    assert_eq!(s.orphaned_files, 1);
    assert_eq!(s.orphaned_hashes, 1);
}
