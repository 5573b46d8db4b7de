// Durable id reservations and per-id success/failure records.
use super::*;

/// Handle to the checkpoint database. The only writer of movie, gif and
/// failed-gif records; everything else goes through these methods.
pub struct CheckpointStore {
    connection: Connection,
}

impl CheckpointStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            connection: open_database(path)?,
        })
    }

    /// Opens an existing store for lookups only. Neither the schema nor the
    /// journal mode is touched.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened checkpoint store {} read-only", path.display());
        Ok(Self { connection })
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        initialize_database(&connection)?;
        Ok(Self { connection })
    }

    pub fn find_movie(&self, hash: &str, stream_index: i64) -> Result<Option<MovieRecord>> {
        load_movie(&self.connection, hash, stream_index)
    }

    /// Returns where to continue for `(hash, stream_index)`, reserving a new
    /// range of `group_count` ids right after the highest id ever handed out
    /// when the pair has not been seen before.
    pub fn reserve_range(
        &self,
        hash: &str,
        stream_index: i64,
        group_count: usize,
    ) -> Result<ResumePoint> {
        let transaction =
            Transaction::new_unchecked(&self.connection, TransactionBehavior::Immediate)?;

        if let Some(movie) = load_movie(&transaction, hash, stream_index)? {
            let highest_gif = highest_gif_id_within(&transaction, movie.start_id, movie.end_id)?;
            let highest_failed =
                highest_failed_id_within(&transaction, movie.start_id, movie.end_id)?;
            transaction.commit()?;
            let point = plan_resume(&movie, highest_gif, highest_failed);
            debug!(
                "Resuming stream {stream_index} of {hash} at id {} (offset {}, range [{}, {}])",
                point.start_id, point.offset, movie.start_id, movie.end_id
            );
            return Ok(point);
        }

        let next_id: i64 = transaction.query_row(
            "SELECT COALESCE(MAX(end_id) + 1, 0) FROM movies",
            [],
            |row| row.get(0),
        )?;
        let end_id = next_id + group_count as i64 - 1;
        transaction.execute(
            r#"
            INSERT INTO movies (hash, stream_index, start_id, end_id)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![hash, stream_index, next_id, end_id],
        )?;
        transaction.commit()?;
        info!(
            "Reserved ids [{next_id}, {end_id}] for stream {stream_index} of {hash} ({group_count} groups)"
        );
        Ok(ResumePoint {
            start_id: next_id,
            end_id,
            offset: 0,
        })
    }

    pub fn record_success(
        &self,
        id: i64,
        name: &str,
        text: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<()> {
        if self.gif(id)?.is_some() {
            return Err(ClipperError::DuplicateId(id));
        }
        self.connection.execute(
            r#"
            INSERT INTO gifs (id, name, text, start_ms, end_ms)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, name, text, start_ms, end_ms],
        )?;
        Ok(())
    }

    pub fn record_failure(&self, id: i64) -> Result<()> {
        if self.gif(id)?.is_some() || self.is_failed(id)? {
            return Err(ClipperError::AlreadyResolved(id));
        }
        self.connection
            .execute("INSERT INTO failed_gifs (gif_id) VALUES (?1)", params![id])?;
        Ok(())
    }

    pub fn gif(&self, id: i64) -> Result<Option<GifRecord>> {
        let gif = self
            .connection
            .query_row(
                r#"
                SELECT id, name, text, start_ms, end_ms, tg_file_id
                FROM gifs
                WHERE id = ?1
                "#,
                params![id],
                row_to_gif,
            )
            .optional()?;
        Ok(gif)
    }

    pub fn is_failed(&self, id: i64) -> Result<bool> {
        let found = self
            .connection
            .query_row(
                "SELECT 1 FROM failed_gifs WHERE gif_id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn gifs_in_range(&self, start_id: i64, end_id: i64) -> Result<Vec<GifRecord>> {
        let mut statement = self.connection.prepare(
            r#"
            SELECT id, name, text, start_ms, end_ms, tg_file_id
            FROM gifs
            WHERE id BETWEEN ?1 AND ?2
            ORDER BY id
            "#,
        )?;
        let rows = statement.query_map(params![start_id, end_id], row_to_gif)?;
        let mut gifs = Vec::new();
        for row in rows {
            gifs.push(row?);
        }
        Ok(gifs)
    }

    pub fn failed_ids_in_range(&self, start_id: i64, end_id: i64) -> Result<Vec<i64>> {
        let mut statement = self.connection.prepare(
            "SELECT gif_id FROM failed_gifs WHERE gif_id BETWEEN ?1 AND ?2 ORDER BY gif_id",
        )?;
        let rows = statement.query_map(params![start_id, end_id], |row| row.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    pub fn all_gifs(&self) -> Result<Vec<GifRecord>> {
        self.gifs_in_range(i64::MIN, i64::MAX)
    }
}
