use std::collections::HashMap;

use crate::Database;
use crate::models::{DirectThread, MessageRow, ThreadRow, ThreadSummary, UserRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, Row, params, params_from_iter};

impl Database {
    // -- Users --

    /// Inserts a user. Returns `None` when the username is already taken.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, email, password, date_joined) VALUES (?1, ?2, ?3, ?4)",
                params![username, email, password_hash, now],
            );
            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, username, email, password, date_joined FROM users WHERE username = ?1",
                username,
            )
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, username, email, password, date_joined FROM users WHERE id = ?1",
                id,
            )
        })
    }

    // -- Threads --

    /// Creates a thread holding exactly `user_id` and `other_id`, unless some
    /// thread already contains both of them. The lookup and the inserts run
    /// in one transaction under one lock, so two racing requests cannot both
    /// create a thread and a failed insert leaves no half-built thread.
    pub fn create_direct_thread(
        &self,
        user_id: i64,
        other_id: i64,
        now: DateTime<Utc>,
    ) -> Result<DirectThread> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT a.thread_id
                     FROM thread_participants a
                     JOIN thread_participants b ON a.thread_id = b.thread_id
                     WHERE a.user_id = ?1 AND b.user_id = ?2
                     ORDER BY a.thread_id
                     LIMIT 1",
                    params![user_id, other_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(id) = existing {
                let participants = query_participant_usernames(&tx, id)?;
                return Ok(DirectThread::Existing { id, participants });
            }

            tx.execute(
                "INSERT INTO threads (created, updated) VALUES (?1, ?1)",
                params![now],
            )?;
            let id = tx.last_insert_rowid();

            {
                let mut stmt =
                    tx.prepare("INSERT INTO thread_participants (thread_id, user_id) VALUES (?1, ?2)")?;
                for participant in [user_id, other_id] {
                    stmt.execute(params![id, participant])?;
                }
            }

            let participants = query_participant_usernames(&tx, id)?;
            tx.commit()?;
            Ok(DirectThread::Created { id, participants })
        })
    }

    /// Returns the thread only if `user_id` participates in it.
    pub fn get_thread_for_participant(&self, thread_id: i64, user_id: i64) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT t.id, t.created, t.updated
                 FROM threads t
                 JOIN thread_participants p ON p.thread_id = t.id
                 WHERE t.id = ?1 AND p.user_id = ?2",
                params![thread_id, user_id],
                thread_from_row,
            )
            .optional()
        })
    }

    pub fn count_threads_for_user(&self, user_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM thread_participants WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn list_threads_for_user(&self, user_id: i64, limit: u64, offset: u64) -> Result<Vec<ThreadRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.created, t.updated
                 FROM threads t
                 JOIN thread_participants p ON p.thread_id = t.id
                 WHERE p.user_id = ?1
                 ORDER BY t.id
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit as i64, offset as i64], thread_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every thread with its participant usernames and message count, by id.
    pub fn list_all_threads(&self) -> Result<Vec<ThreadSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.created, COUNT(m.id)
                 FROM threads t
                 LEFT JOIN messages m ON m.thread_id = t.id
                 GROUP BY t.id
                 ORDER BY t.id",
            )?;
            let mut threads = stmt
                .query_map([], |row| {
                    Ok(ThreadSummary {
                        id: row.get(0)?,
                        created: row.get(1)?,
                        participants: Vec::new(),
                        message_count: row.get::<_, i64>(2)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT p.thread_id, u.username
                 FROM thread_participants p
                 JOIN users u ON u.id = p.user_id
                 ORDER BY p.thread_id, u.id",
            )?;
            let mut names: HashMap<i64, Vec<String>> = HashMap::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                names.entry(row.get(0)?).or_default().push(row.get(1)?);
            }

            for thread in &mut threads {
                thread.participants = names.remove(&thread.id).unwrap_or_default();
            }
            Ok(threads)
        })
    }

    /// Deletes a thread together with its participants and messages.
    /// Returns false when no such thread exists.
    pub fn delete_thread(&self, thread_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM threads WHERE id = ?1", [thread_id])?;
            Ok(deleted > 0)
        })
    }

    /// Batch-fetch participant ids for a set of threads, ascending per thread.
    pub fn get_participants(&self, thread_ids: &[i64]) -> Result<HashMap<i64, Vec<i64>>> {
        if thread_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT thread_id, user_id FROM thread_participants
                 WHERE thread_id IN ({})
                 ORDER BY thread_id, user_id",
                placeholders(thread_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(thread_ids.iter()))?;

            let mut participants: HashMap<i64, Vec<i64>> = HashMap::new();
            while let Some(row) = rows.next()? {
                participants.entry(row.get(0)?).or_default().push(row.get(1)?);
            }
            Ok(participants)
        })
    }

    // -- Messages --

    /// Stores a message and refreshes the owning thread's `updated` stamp.
    pub fn insert_message(
        &self,
        thread_id: i64,
        sender_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (thread_id, sender_id, text, created, is_read)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![thread_id, sender_id, text, now],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE threads SET updated = ?2 WHERE id = ?1",
                params![thread_id, now],
            )?;
            tx.commit()?;

            Ok(MessageRow {
                id,
                thread_id,
                sender_id,
                text: text.to_string(),
                created: now,
                is_read: false,
            })
        })
    }

    pub fn count_messages(&self, thread_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE thread_id = ?1",
                [thread_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Messages of a thread in insertion order.
    pub fn list_messages(&self, thread_id: i64, limit: u64, offset: u64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, thread_id, sender_id, text, created, is_read
                 FROM messages
                 WHERE thread_id = ?1
                 ORDER BY id
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![thread_id, limit as i64, offset as i64], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flags every message of the thread as read. Returns the number of rows
    /// that changed state.
    pub fn mark_thread_read(&self, thread_id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1 WHERE thread_id = ?1 AND is_read = 0",
                [thread_id],
            )?;
            Ok(changed)
        })
    }

    /// Latest message of each given thread, in a single query. Threads with
    /// no messages are absent from the map.
    pub fn get_last_messages(&self, thread_ids: &[i64]) -> Result<HashMap<i64, MessageRow>> {
        if thread_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, thread_id, sender_id, text, created, is_read
                 FROM messages
                 WHERE id IN (
                     SELECT MAX(id) FROM messages
                     WHERE thread_id IN ({})
                     GROUP BY thread_id
                 )",
                placeholders(thread_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(thread_ids.iter()), message_from_row)?
                .map(|row| row.map(|m| (m.thread_id, m)))
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;
            Ok(rows)
        })
    }

    /// Unread messages addressed to `user_id`: in one of their threads, not
    /// yet read, and sent by someone else.
    pub fn count_unread_for_user(&self, user_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*)
                 FROM messages m
                 JOIN thread_participants p ON p.thread_id = m.thread_id
                 WHERE p.user_id = ?1 AND m.is_read = 0 AND m.sender_id != ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, sql: &str, key: P) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                date_joined: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_participant_usernames(conn: &Connection, thread_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT u.username
         FROM thread_participants p
         JOIN users u ON u.id = p.user_id
         WHERE p.thread_id = ?1
         ORDER BY u.id",
    )?;
    let names = stmt
        .query_map([thread_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<ThreadRow> {
    Ok(ThreadRow {
        id: row.get(0)?,
        created: row.get(1)?,
        updated: row.get(2)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        sender_id: row.get(2)?,
        text: row.get(3)?,
        created: row.get(4)?,
        is_read: row.get(5)?,
    })
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
