use super::models::StatusSnapshot;
use super::sqlite::Database;
use rusqlite::{params, Result};

impl Database {
    /// Directory, file, duplicate and integrity statistics in one read-only pass.
    pub fn status_snapshot(&self) -> Result<StatusSnapshot> {
        let conn = self.connection();
        let mut s = StatusSnapshot::default();

        (
            s.total_dirs,
            s.pending_dirs,
            s.indexing_dirs,
            s.done_dirs,
            s.last_completed_scan,
        ) = conn.query_row(
            "SELECT COUNT(*), \
                    COALESCE(SUM(status = 'pending'), 0), \
                    COALESCE(SUM(status = 'indexing'), 0), \
                    COALESCE(SUM(status = 'done'), 0), \
                    MAX(CASE WHEN status = 'done' THEN last_seen END) \
             FROM dirs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;
        s.indexing_in_progress = s.indexing_dirs > 0;

        (s.total_files, s.total_bytes) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM files",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        (s.files_seen_last_scan, s.stale_files) = conn.query_row(
            "SELECT COALESCE(SUM(?1 IS NOT NULL AND last_seen = ?1), 0), \
                    COALESCE(SUM(last_seen IS NULL OR (?1 IS NOT NULL AND last_seen < ?1)), 0) \
             FROM files",
            params![s.last_completed_scan],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        s.unique_hashes = conn.query_row(
            "SELECT COUNT(DISTINCT hash_id) FROM files",
            [],
            |row| row.get(0),
        )?;

        (s.duplicate_groups, s.duplicate_files) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(n), 0) FROM ( \
                 SELECT COUNT(*) AS n FROM files GROUP BY hash_id HAVING COUNT(*) > 1 \
             )",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        (s.unresolved_groups, s.unresolved_files) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(n), 0) FROM ( \
                 SELECT COUNT(*) AS n FROM files GROUP BY hash_id \
                 HAVING COUNT(DISTINCT size) > 1 \
             )",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        s.orphaned_files = conn.query_row(
            "SELECT COUNT(*) FROM files f \
             LEFT JOIN dirs d ON d.id = f.dir_id \
             WHERE d.id IS NULL",
            [],
            |row| row.get(0),
        )?;

        s.orphaned_hashes = conn.query_row(
            "SELECT COUNT(*) FROM hashes h \
             WHERE NOT EXISTS (SELECT 1 FROM files f WHERE f.hash_id = h.id)",
            [],
            |row| row.get(0),
        )?;

        Ok(s)
    }
}
