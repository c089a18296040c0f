use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

fn directory_from_row(row: &Row<'_>) -> Result<Directory> {
    Ok(Directory {
        id: row.get(0)?,
        path: row.get(1)?,
        status: row.get(2)?,
        last_seen: row.get(3)?,
    })
}

fn file_from_row(row: &Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        dir_id: row.get(2)?,
        size: row.get(3)?,
        mtime_ns: row.get(4)?,
        inode: row.get(5)?,
        device: row.get(6)?,
        hash_id: row.get(7)?,
        last_seen: row.get(8)?,
    })
}

impl Database {
    // ── Directories ──────────────────────────────────────────────

    /// Enqueue a directory as pending. Re-discovering a known path changes nothing.
    /// Returns the number of rows inserted (0 or 1).
    pub fn insert_directory(&self, path: &str) -> Result<usize> {
        self.connection()
            .prepare_cached(
                "INSERT INTO dirs (path, status) VALUES (?1, 'pending') \
                 ON CONFLICT(path) DO NOTHING",
            )?
            .execute(params![path])
    }

    pub fn get_directory(&self, path: &str) -> Result<Option<Directory>> {
        self.connection()
            .query_row(
                "SELECT id, path, status, last_seen FROM dirs WHERE path = ?1",
                params![path],
                directory_from_row,
            )
            .optional()
    }

    /// The pending directory with the lowest id, if any.
    pub fn next_pending_directory(&self) -> Result<Option<Directory>> {
        self.connection()
            .query_row(
                "SELECT id, path, status, last_seen FROM dirs \
                 WHERE status = 'pending' ORDER BY id LIMIT 1",
                [],
                directory_from_row,
            )
            .optional()
    }

    pub fn mark_directory_indexing(&self, dir_id: i64) -> Result<()> {
        self.connection().execute(
            "UPDATE dirs SET status = ?1 WHERE id = ?2 AND status = 'pending'",
            params![DirStatus::Indexing, dir_id],
        )?;
        Ok(())
    }

    pub fn mark_directory_done(&self, dir_id: i64, epoch: i64) -> Result<()> {
        self.connection().execute(
            "UPDATE dirs SET status = ?1, last_seen = ?2 WHERE id = ?3",
            params![DirStatus::Done, epoch, dir_id],
        )?;
        Ok(())
    }

    /// Put every directory left `indexing` by an interrupted run back in the queue.
    pub fn reset_in_flight_directories(&self) -> Result<usize> {
        let count = self.connection().execute(
            "UPDATE dirs SET status = 'pending' WHERE status = 'indexing'",
            [],
        )?;
        if count > 0 {
            debug!("Reset {} interrupted directories to pending", count);
        }
        Ok(count)
    }

    /// Re-queue every finished directory so the next run rescans the whole tree.
    pub fn requeue_done_directories(&self) -> Result<usize> {
        self.connection().execute(
            "UPDATE dirs SET status = 'pending' WHERE status = 'done'",
            [],
        )
    }

    pub fn list_directories(&self) -> Result<Vec<Directory>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT id, path, status, last_seen FROM dirs ORDER BY id")?;
        let dirs = stmt
            .query_map([], directory_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(dirs)
    }

    // ── Scan Pass ────────────────────────────────────────────────

    /// Epoch stamped by the pass in progress, or by the last one if none is.
    pub fn pass_epoch(&self) -> Result<Option<i64>> {
        self.connection()
            .query_row("SELECT epoch FROM scan_pass WHERE id = 1", [], |row| row.get(0))
            .optional()
    }

    pub fn set_pass_epoch(&self, epoch: i64) -> Result<()> {
        self.connection().execute(
            "INSERT INTO scan_pass (id, epoch) VALUES (1, ?1) \
             ON CONFLICT(id) DO UPDATE SET epoch = excluded.epoch",
            params![epoch],
        )?;
        Ok(())
    }

    // ── Hashes ───────────────────────────────────────────────────

    /// Insert the digest if it is new and return its canonical id either way.
    pub fn intern_hash(&self, hash: &str, size: i64) -> Result<i64> {
        self.connection()
            .prepare_cached(
                "INSERT INTO hashes (hash, size) VALUES (?1, ?2) \
                 ON CONFLICT(hash) DO NOTHING",
            )?
            .execute(params![hash, size])?;
        self.connection()
            .prepare_cached("SELECT id FROM hashes WHERE hash = ?1")?
            .query_row(params![hash], |row| row.get(0))
    }

    pub fn get_hash(&self, hash_id: i64) -> Result<Option<HashRecord>> {
        self.connection()
            .query_row(
                "SELECT id, hash, size FROM hashes WHERE id = ?1",
                params![hash_id],
                |row| {
                    Ok(HashRecord {
                        id: row.get(0)?,
                        hash: row.get(1)?,
                        size: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    // ── Files ────────────────────────────────────────────────────

    /// Insert or update a file row in one guarded statement. An existing row is
    /// only rewritten when a tracked field differs, so repeating the same call
    /// changes nothing. Returns the number of rows written.
    pub fn upsert_file(&self, meta: &FileMetadata) -> Result<usize> {
        self.connection()
            .prepare_cached(
                "INSERT INTO files (path, dir_id, size, mtime_ns, inode, device, hash_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(path) DO UPDATE SET \
                     dir_id   = excluded.dir_id, \
                     size     = excluded.size, \
                     mtime_ns = excluded.mtime_ns, \
                     inode    = excluded.inode, \
                     device   = excluded.device, \
                     hash_id  = excluded.hash_id \
                 WHERE files.dir_id   != excluded.dir_id \
                    OR files.size     != excluded.size \
                    OR files.mtime_ns != excluded.mtime_ns \
                    OR files.inode    != excluded.inode \
                    OR files.device   != excluded.device \
                    OR files.hash_id  != excluded.hash_id",
            )?
            .execute(params![
                meta.path,
                meta.dir_id,
                meta.size,
                meta.mtime_ns,
                meta.inode,
                meta.device,
                meta.hash_id,
            ])
    }

    /// Stamp `last_seen` on the listed files of a directory.
    pub fn mark_files_seen<S: AsRef<str>>(
        &self,
        dir_id: i64,
        paths: &[S],
        epoch: i64,
    ) -> Result<usize> {
        let mut stmt = self.connection().prepare_cached(
            "UPDATE files SET last_seen = ?1 WHERE dir_id = ?2 AND path = ?3",
        )?;
        let mut count = 0;
        for path in paths {
            count += stmt.execute(params![epoch, dir_id, path.as_ref()])?;
        }
        Ok(count)
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                "SELECT id, path, dir_id, size, mtime_ns, inode, device, hash_id, last_seen \
                 FROM files WHERE path = ?1",
                params![path],
                file_from_row,
            )
            .optional()
    }

    pub fn files_for_hash(&self, hash_id: i64) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, path, dir_id, size, mtime_ns, inode, device, hash_id, last_seen \
             FROM files WHERE hash_id = ?1 ORDER BY path",
        )?;
        let files = stmt
            .query_map(params![hash_id], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    // ── Duplicate Groups ─────────────────────────────────────────

    /// Duplicate groups, largest waste first.
    pub fn duplicate_groups(&self, offset: i64, limit: i64) -> Result<Vec<DuplicateGroup>> {
        let mut stmt = self.connection().prepare(
            "SELECT h.id, h.hash, h.size, COUNT(*) AS file_count, \
                    (COUNT(*) - 1) * h.size AS wasted_bytes, \
                    COUNT(DISTINCT f.size) > 1 AS unresolved \
             FROM files f \
             JOIN hashes h ON h.id = f.hash_id \
             GROUP BY h.id \
             HAVING COUNT(*) > 1 \
             ORDER BY wasted_bytes DESC, h.hash \
             LIMIT ?1 OFFSET ?2",
        )?;
        let groups = stmt
            .query_map(params![limit, offset], |row| {
                Ok(DuplicateGroup {
                    hash_id: row.get(0)?,
                    hash: row.get(1)?,
                    size: row.get(2)?,
                    file_count: row.get(3)?,
                    wasted_bytes: row.get(4)?,
                    unresolved: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(groups)
    }
}
