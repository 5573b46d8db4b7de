// SQLite schema/bootstrap and row mapping for checkpoint records.
use super::*;

pub(super) fn initialize_database(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        r#"
            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL,
                stream_index INTEGER NOT NULL,
                start_id INTEGER NOT NULL,
                end_id INTEGER NOT NULL,
                UNIQUE(hash, stream_index)
            );

            CREATE TABLE IF NOT EXISTS gifs (
                id INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL,
                tg_file_id TEXT
            );

            CREATE TABLE IF NOT EXISTS failed_gifs (
                gif_id INTEGER PRIMARY KEY NOT NULL
            );
            "#,
    )?;
    Ok(())
}

pub(super) fn open_database(path: &Path) -> Result<Connection> {
    let connection = Connection::open(path)?;
    connection.execute_batch(
        r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            "#,
    )?;
    initialize_database(&connection)?;
    debug!("Opened checkpoint store {}", path.display());
    Ok(connection)
}

pub(super) fn row_to_movie(row: &rusqlite::Row<'_>) -> rusqlite::Result<MovieRecord> {
    Ok(MovieRecord {
        id: row.get("id")?,
        hash: row.get("hash")?,
        stream_index: row.get("stream_index")?,
        start_id: row.get("start_id")?,
        end_id: row.get("end_id")?,
    })
}

pub(super) fn row_to_gif(row: &rusqlite::Row<'_>) -> rusqlite::Result<GifRecord> {
    Ok(GifRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        text: row.get("text")?,
        start_ms: row.get("start_ms")?,
        end_ms: row.get("end_ms")?,
        tg_file_id: row.get("tg_file_id")?,
    })
}

pub(super) fn load_movie(
    connection: &Connection,
    hash: &str,
    stream_index: i64,
) -> Result<Option<MovieRecord>> {
    let movie = connection
        .query_row(
            r#"
            SELECT id, hash, stream_index, start_id, end_id
            FROM movies
            WHERE hash = ?1 AND stream_index = ?2
            "#,
            params![hash, stream_index],
            row_to_movie,
        )
        .optional()?;
    Ok(movie)
}

pub(super) fn highest_gif_id_within(
    connection: &Connection,
    start_id: i64,
    end_id: i64,
) -> Result<Option<i64>> {
    let highest = connection.query_row(
        "SELECT MAX(id) FROM gifs WHERE id BETWEEN ?1 AND ?2",
        params![start_id, end_id],
        |row| row.get::<_, Option<i64>>(0),
    )?;
    Ok(highest)
}

pub(super) fn highest_failed_id_within(
    connection: &Connection,
    start_id: i64,
    end_id: i64,
) -> Result<Option<i64>> {
    let highest = connection.query_row(
        "SELECT MAX(gif_id) FROM failed_gifs WHERE gif_id BETWEEN ?1 AND ?2",
        params![start_id, end_id],
        |row| row.get::<_, Option<i64>>(0),
    )?;
    Ok(highest)
}
