//! Operator commands run against the database directly, outside the HTTP
//! surface.

use std::io::Write;

use anyhow::{Result, bail};
use tracing::info;

use parley_api::tokens::JwtIssuer;
use parley_db::Database;

/// One line per thread: id, participant usernames, message count, creation time.
pub fn list_threads(db: &Database, out: &mut impl Write) -> Result<()> {
    let threads = db.list_all_threads()?;
    if threads.is_empty() {
        writeln!(out, "No threads")?;
        return Ok(());
    }
    for thread in threads {
        writeln!(
            out,
            "{}\t[{}]\t{} messages\t{}",
            thread.id,
            thread.participants.join(", "),
            thread.message_count,
            thread.created.to_rfc3339()
        )?;
    }
    Ok(())
}

/// Removes a thread and, through the schema's cascades, all of its messages.
pub fn delete_thread(db: &Database, thread_id: i64, out: &mut impl Write) -> Result<()> {
    if !db.delete_thread(thread_id)? {
        bail!("thread {} does not exist", thread_id);
    }
    info!("Thread {} deleted by operator", thread_id);
    writeln!(out, "Deleted thread {}", thread_id)?;
    Ok(())
}

/// Prints a fresh access token for `username`.
pub fn issue_token(db: &Database, tokens: &JwtIssuer, username: &str, out: &mut impl Write) -> Result<()> {
    let Some(user) = db.get_user_by_username(username)? else {
        bail!("user {} is not registered", username);
    };
    let access = tokens.issue_access(user.id, &user.username)?;
    info!("Access token issued to {} by operator", user.username);
    writeln!(out, "{}", access)?;
    Ok(())
}
