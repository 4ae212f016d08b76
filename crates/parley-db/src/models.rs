//! Database row types — these map directly to SQLite rows.
//! Distinct from parley-types API models to keep the DB layer independent.

use chrono::{DateTime, Utc};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub date_joined: DateTime<Utc>,
}

pub struct ThreadRow {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
    pub is_read: bool,
}

/// Outcome of asking for a direct thread between two users.
#[derive(Debug, PartialEq, Eq)]
pub enum DirectThread {
    Created { id: i64, participants: Vec<String> },
    /// A thread already holds both users; nothing was written.
    Existing { id: i64, participants: Vec<String> },
}

/// A thread as listed for administration: participant usernames and the
/// number of messages it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub participants: Vec<String>,
    pub message_count: u64,
}
