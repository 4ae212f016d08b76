use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL DEFAULT '',
                password    TEXT NOT NULL,
                date_joined TEXT NOT NULL
            );

            CREATE TABLE threads (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                created     TEXT NOT NULL,
                updated     TEXT NOT NULL
            );

            CREATE TABLE thread_participants (
                thread_id   INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (thread_id, user_id)
            );

            CREATE INDEX idx_thread_participants_user
                ON thread_participants(user_id);

            CREATE TABLE messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id   INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                sender_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text        TEXT NOT NULL,
                created     TEXT NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_messages_thread
                ON messages(thread_id, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
