//! Row → wire conversions.

use std::collections::HashMap;

use parley_db::models::{MessageRow, ThreadRow};
use parley_types::api::{MessageResponse, ThreadResponse};

pub fn message(row: &MessageRow) -> MessageResponse {
    MessageResponse {
        text: row.text.clone(),
        created: row.created,
        is_read: row.is_read,
    }
}

/// Per-page context for thread serialization: the latest message and the
/// participant ids of each thread, fetched in batch before formatting.
#[derive(Default)]
pub struct ThreadContext {
    pub last_messages: HashMap<i64, MessageRow>,
    pub participants: HashMap<i64, Vec<i64>>,
}

impl ThreadContext {
    pub fn thread(&self, row: &ThreadRow) -> ThreadResponse {
        ThreadResponse {
            id: row.id,
            participants: self.participants.get(&row.id).cloned().unwrap_or_default(),
            created: row.created,
            updated: row.updated,
            last_message: self.last_messages.get(&row.id).map(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn thread_row(id: i64) -> ThreadRow {
        let now = Utc::now();
        ThreadRow { id, created: now, updated: now }
    }

    #[test]
    fn last_message_taken_from_context() {
        let mut ctx = ThreadContext::default();
        ctx.participants.insert(1, vec![4, 9]);
        ctx.last_messages.insert(
            1,
            MessageRow {
                id: 12,
                thread_id: 1,
                sender_id: 9,
                text: "see you".into(),
                created: Utc::now(),
                is_read: true,
            },
        );

        let with = ctx.thread(&thread_row(1));
        assert_eq!(with.participants, vec![4, 9]);
        let last = with.last_message.unwrap();
        assert_eq!(last.text, "see you");
        assert!(last.is_read);

        let without = ctx.thread(&thread_row(2));
        assert!(without.last_message.is_none());
        assert!(without.participants.is_empty());
    }
}
