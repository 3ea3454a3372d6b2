use parley_types::models::Checkmark;
use rusqlite::params;
use tracing::debug;

use crate::Database;
use crate::clock::encode_ts;
use crate::error::{OptionalExt, Result};
use crate::messages::query_group_message;
use crate::store::ReceiptStore;

impl ReceiptStore for Database {
    fn mark_direct_conversation_read(&self, reader: &str, peer: &str) -> Result<usize> {
        let now = encode_ts(self.now());

        // `read_at IS NULL` keeps the first read time: receipts never go back.
        let marked = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE direct_message_receipts SET read_at = ?1
                 WHERE recipient_id = ?2 AND read_at IS NULL
                   AND message_id IN (SELECT id FROM direct_messages WHERE sender_id = ?3 AND receiver_id = ?2)",
                params![now, reader, peer],
            )?)
        })?;

        if marked > 0 {
            debug!("{} marked {} messages from {} as read", reader, marked, peer);
        }
        Ok(marked)
    }

    fn mark_group_conversation_read(&self, group_id: i64, reader: &str) -> Result<usize> {
        let now = encode_ts(self.now());

        let marked = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE group_message_receipts SET read_at = ?1
                 WHERE group_id = ?2 AND recipient_id = ?3 AND read_at IS NULL",
                params![now, group_id, reader],
            )?)
        })?;

        if marked > 0 {
            debug!("{} marked {} messages in group {} as read", reader, marked, group_id);
        }
        Ok(marked)
    }

    fn direct_checkmark(&self, message_id: i64) -> Result<Checkmark> {
        self.with_conn(|conn| {
            let read_at: Option<Option<String>> = conn
                .query_row(
                    "SELECT read_at FROM direct_message_receipts WHERE message_id = ?1",
                    [message_id],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(match read_at {
                Some(Some(_)) => Checkmark::Read,
                // No receipt row: the message predates receipt tracking.
                Some(None) | None => Checkmark::Delivered,
            })
        })
    }

    fn group_checkmark(&self, group_id: i64, message_id: i64) -> Result<Checkmark> {
        self.with_conn(|conn| {
            // The message must belong to this group.
            query_group_message(conn, group_id, message_id)?;

            let (total, read): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COUNT(read_at) FROM group_message_receipts
                 WHERE group_id = ?1 AND message_id = ?2",
                params![group_id, message_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(checkmark_from_counts(total, read))
        })
    }
}

/// Read once every recipient has read. No recipients at all (a group of
/// one) counts as read.
fn checkmark_from_counts(total: i64, read: i64) -> Checkmark {
    if read >= total {
        Checkmark::Read
    } else {
        Checkmark::Delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Entity, StoreError};
    use crate::store::{MembershipStore, MessageStore};
    use crate::testing::test_db;
    use chrono::Duration;

    #[test]
    fn counts_to_checkmark() {
        assert_eq!(checkmark_from_counts(0, 0), Checkmark::Read);
        assert_eq!(checkmark_from_counts(3, 3), Checkmark::Read);
        assert_eq!(checkmark_from_counts(3, 2), Checkmark::Delivered);
    }

    #[test]
    fn reading_a_direct_conversation_flips_checkmark() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "did you see?").unwrap();
        assert_eq!(db.direct_checkmark(id).unwrap(), Checkmark::Delivered);

        // Reading as the sender changes nothing.
        assert_eq!(db.mark_direct_conversation_read("alice", "bob").unwrap(), 0);
        assert_eq!(db.direct_checkmark(id).unwrap(), Checkmark::Delivered);

        assert_eq!(db.mark_direct_conversation_read("bob", "alice").unwrap(), 1);
        assert_eq!(db.direct_checkmark(id).unwrap(), Checkmark::Read);
    }

    #[test]
    fn read_at_never_moves_or_reverts() {
        let (db, clock) = test_db();
        let id = db.create_direct_message("alice", "bob", "x").unwrap();
        db.mark_direct_conversation_read("bob", "alice").unwrap();
        let first = read_at(&db, id);

        clock.advance(Duration::hours(1));
        assert_eq!(db.mark_direct_conversation_read("bob", "alice").unwrap(), 0);
        assert_eq!(read_at(&db, id), first);
        assert_eq!(db.direct_checkmark(id).unwrap(), Checkmark::Read);
    }

    #[test]
    fn marking_one_peer_leaves_others_unread() {
        let (db, _) = test_db();
        let from_alice = db.create_direct_message("alice", "bob", "a").unwrap();
        let from_carol = db.create_direct_message("carol", "bob", "c").unwrap();

        db.mark_direct_conversation_read("bob", "alice").unwrap();
        assert_eq!(db.direct_checkmark(from_alice).unwrap(), Checkmark::Read);
        assert_eq!(db.direct_checkmark(from_carol).unwrap(), Checkmark::Delivered);
    }

    #[test]
    fn missing_direct_receipt_reads_as_delivered() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "legacy").unwrap();
        db.with_conn(|conn| {
            conn.execute("DELETE FROM direct_message_receipts WHERE message_id = ?1", [id])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.direct_checkmark(id).unwrap(), Checkmark::Delivered);
    }

    #[test]
    fn group_checkmark_needs_every_recipient() {
        let (db, _) = test_db();
        let group = db
            .create_group("alice", "team", &["bob".into(), "carol".into()])
            .unwrap();
        let id = db.create_group_message(group, "alice", "standup").unwrap();

        assert_eq!(db.mark_group_conversation_read(group, "bob").unwrap(), 1);
        assert_eq!(db.group_checkmark(group, id).unwrap(), Checkmark::Delivered);

        db.mark_group_conversation_read(group, "carol").unwrap();
        assert_eq!(db.group_checkmark(group, id).unwrap(), Checkmark::Read);

        db.mark_group_conversation_read(group, "carol").unwrap();
        assert_eq!(db.group_checkmark(group, id).unwrap(), Checkmark::Read);
    }

    #[test]
    fn group_checkmark_is_scoped_to_its_group() {
        let (db, _) = test_db();
        let ours = db.create_group("alice", "ours", &["bob".into()]).unwrap();
        let theirs = db.create_group("carol", "theirs", &[]).unwrap();
        let id = db.create_group_message(ours, "alice", "hi").unwrap();

        assert!(matches!(
            db.group_checkmark(theirs, id),
            Err(StoreError::NotFound(Entity::Message))
        ));
        assert!(matches!(
            db.group_checkmark(ours, id + 100),
            Err(StoreError::NotFound(Entity::Message))
        ));
        assert_eq!(db.group_checkmark(ours, id).unwrap(), Checkmark::Delivered);
    }

    #[test]
    fn solo_group_message_is_read() {
        let (db, _) = test_db();
        let group = db.create_group("alice", "notes", &[]).unwrap();
        let id = db.create_group_message(group, "alice", "remember milk").unwrap();
        assert_eq!(db.group_checkmark(group, id).unwrap(), Checkmark::Read);
    }

    fn read_at(db: &Database, message_id: i64) -> Option<String> {
        db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT read_at FROM direct_message_receipts WHERE message_id = ?1",
                [message_id],
                |r| r.get(0),
            )?)
        })
        .unwrap()
    }
}
