use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::Database;
use crate::clock::{encode_ts, ts_column};
use crate::error::{Entity, OptionalExt, Result, StoreError};
use crate::membership::group_exists;
use crate::models::{DirectMessageRow, GroupMessageRow, Page};
use crate::store::MessageStore;

impl MessageStore for Database {
    // -- Direct messages --

    fn create_direct_message(&self, sender: &str, receiver: &str, body: &str) -> Result<i64> {
        let now = encode_ts(self.now());

        let message_id = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO direct_messages (sender_id, receiver_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![sender, receiver, body, now],
            )?;
            let message_id = tx.last_insert_rowid();

            // The sender never gets a receipt, even when writing to themself.
            if sender != receiver {
                tx.execute(
                    "INSERT INTO direct_message_receipts (message_id, recipient_id, received_at, read_at)
                     VALUES (?1, ?2, ?3, NULL)",
                    params![message_id, receiver, now],
                )?;
            }
            Ok(message_id)
        })?;

        debug!("Direct message {} stored ({} -> {})", message_id, sender, receiver);
        Ok(message_id)
    }

    fn list_direct_messages(&self, a: &str, b: &str, page: Page) -> Result<Vec<DirectMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, m.receiver_id, m.body, m.created_at
                 FROM direct_messages m
                 WHERE ((m.sender_id = ?1 AND m.receiver_id = ?2) OR (m.sender_id = ?2 AND m.receiver_id = ?1))
                   AND NOT EXISTS (SELECT 1 FROM direct_message_deletions d WHERE d.message_id = m.id)
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT ?3 OFFSET ?4",
            )?;

            let rows = stmt
                .query_map(params![a, b, page.limit, page.offset], direct_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    fn get_direct_message_in_conversation(
        &self,
        a: &str,
        b: &str,
        message_id: i64,
    ) -> Result<DirectMessageRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, sender_id, receiver_id, body, created_at FROM direct_messages
                 WHERE id = ?1 AND ((sender_id = ?2 AND receiver_id = ?3) OR (sender_id = ?3 AND receiver_id = ?2))",
                params![message_id, a, b],
                direct_message_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Message))
        })
    }

    fn delete_direct_message(&self, message_id: i64, requester: &str) -> Result<()> {
        let now = encode_ts(self.now());

        self.with_conn(|conn| {
            let sender: Option<String> = conn
                .query_row(
                    "SELECT sender_id FROM direct_messages WHERE id = ?1",
                    [message_id],
                    |row| row.get(0),
                )
                .optional()?;
            ensure_sender(sender, requester)?;

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO direct_message_deletions (message_id, deleted_by, deleted_at) VALUES (?1, ?2, ?3)",
                params![message_id, requester, now],
            )?;
            if inserted == 0 {
                debug!("Direct message {} was already deleted", message_id);
            }
            Ok(())
        })
    }

    // -- Group messages --

    fn create_group_message(&self, group_id: i64, sender: &str, body: &str) -> Result<i64> {
        let now = encode_ts(self.now());

        let (message_id, fan_out) = self.with_tx(|tx| {
            if !group_exists(tx, group_id)? {
                return Err(StoreError::NotFound(Entity::Group));
            }

            tx.execute(
                "INSERT INTO group_messages (group_id, sender_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![group_id, sender, body, now],
            )?;
            let message_id = tx.last_insert_rowid();

            let fan_out = tx.execute(
                "INSERT OR IGNORE INTO group_message_receipts (message_id, group_id, recipient_id, received_at, read_at)
                 SELECT ?1, group_id, user_id, ?2, NULL FROM group_members
                 WHERE group_id = ?3 AND user_id <> ?4",
                params![message_id, now, group_id, sender],
            )?;
            Ok((message_id, fan_out))
        })?;

        debug!(
            "Group message {} stored in group {} by {} ({} receipts)",
            message_id, group_id, sender, fan_out
        );
        Ok(message_id)
    }

    fn list_group_messages(&self, group_id: i64, page: Page) -> Result<Vec<GroupMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.group_id, m.sender_id, m.body, m.created_at
                 FROM group_messages m
                 WHERE m.group_id = ?1
                   AND NOT EXISTS (SELECT 1 FROM group_message_deletions d WHERE d.message_id = m.id)
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(params![group_id, page.limit, page.offset], group_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    fn get_group_message_in_group(&self, group_id: i64, message_id: i64) -> Result<GroupMessageRow> {
        self.with_conn(|conn| query_group_message(conn, group_id, message_id))
    }

    fn delete_group_message(&self, group_id: i64, message_id: i64, requester: &str) -> Result<()> {
        let now = encode_ts(self.now());

        self.with_conn(|conn| {
            let sender: Option<String> = conn
                .query_row(
                    "SELECT sender_id FROM group_messages WHERE id = ?1 AND group_id = ?2",
                    params![message_id, group_id],
                    |row| row.get(0),
                )
                .optional()?;
            ensure_sender(sender, requester)?;

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO group_message_deletions (message_id, group_id, deleted_by, deleted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![message_id, group_id, requester, now],
            )?;
            if inserted == 0 {
                debug!("Group message {} was already deleted", message_id);
            }
            Ok(())
        })
    }
}

fn ensure_sender(sender: Option<String>, requester: &str) -> Result<()> {
    match sender {
        None => Err(StoreError::NotFound(Entity::Message)),
        Some(sender) if sender != requester => Err(StoreError::Forbidden),
        Some(_) => Ok(()),
    }
}

pub(crate) fn direct_message_exists(conn: &Connection, message_id: i64) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM direct_messages WHERE id = ?1",
            [message_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn query_group_message(
    conn: &Connection,
    group_id: i64,
    message_id: i64,
) -> Result<GroupMessageRow> {
    conn.query_row(
        "SELECT id, group_id, sender_id, body, created_at FROM group_messages WHERE id = ?1 AND group_id = ?2",
        params![message_id, group_id],
        group_message_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::Message))
}

fn direct_message_from_row(row: &Row<'_>) -> rusqlite::Result<DirectMessageRow> {
    Ok(DirectMessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        body: row.get(3)?,
        created_at: ts_column(row, 4)?,
    })
}

fn group_message_from_row(row: &Row<'_>) -> rusqlite::Result<GroupMessageRow> {
    Ok(GroupMessageRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        sender_id: row.get(2)?,
        body: row.get(3)?,
        created_at: ts_column(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MembershipStore, ReceiptStore};
    use crate::testing::test_db;
    use chrono::Duration;
    use parley_types::models::Checkmark;

    #[test]
    fn direct_messages_list_newest_first_and_page() {
        let (db, clock) = test_db();
        let mut ids = Vec::new();
        for i in 0..5 {
            let (from, to) = if i % 2 == 0 { ("alice", "bob") } else { ("bob", "alice") };
            ids.push(db.create_direct_message(from, to, &format!("msg {i}")).unwrap());
            clock.advance(Duration::seconds(1));
        }
        db.create_direct_message("alice", "carol", "elsewhere").unwrap();

        let all = db.list_direct_messages("bob", "alice", Page::default()).unwrap();
        let listed: Vec<i64> = all.iter().map(|m| m.id).collect();
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(listed, expected);

        let second_page = db.list_direct_messages("alice", "bob", Page::new(2, 2)).unwrap();
        assert_eq!(second_page.len(), 2);
        assert_eq!(second_page[0].body, "msg 2");
        assert_eq!(second_page[1].body, "msg 1");
    }

    #[test]
    fn ids_increase_monotonically() {
        let (db, _) = test_db();
        let first = db.create_direct_message("alice", "bob", "one").unwrap();
        let second = db.create_direct_message("alice", "bob", "two").unwrap();
        assert!(second > first);
    }

    #[test]
    fn message_from_other_pair_is_not_found() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "hi").unwrap();

        assert_eq!(db.get_direct_message_in_conversation("bob", "alice", id).unwrap().body, "hi");
        let err = db.get_direct_message_in_conversation("alice", "carol", id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Entity::Message)));
    }

    #[test]
    fn delete_is_sender_only_and_idempotent() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "oops").unwrap();

        assert!(matches!(db.delete_direct_message(id, "bob"), Err(StoreError::Forbidden)));
        assert_eq!(db.list_direct_messages("alice", "bob", Page::default()).unwrap().len(), 1);

        db.delete_direct_message(id, "alice").unwrap();
        db.delete_direct_message(id, "alice").unwrap();
        assert!(db.list_direct_messages("alice", "bob", Page::default()).unwrap().is_empty());

        let markers: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM direct_message_deletions WHERE message_id = ?1",
                    [id],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(markers, 1);

        assert!(matches!(
            db.delete_direct_message(id + 100, "alice"),
            Err(StoreError::NotFound(Entity::Message))
        ));
    }

    #[test]
    fn direct_message_gets_one_unread_receipt() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "ping").unwrap();

        let (recipient, read_at): (String, Option<String>) = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT recipient_id, read_at FROM direct_message_receipts WHERE message_id = ?1",
                    [id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )?)
            })
            .unwrap();
        assert_eq!(recipient, "bob");
        assert!(read_at.is_none());
        assert_eq!(db.direct_checkmark(id).unwrap(), Checkmark::Delivered);
    }

    #[test]
    fn group_message_fans_out_to_everyone_but_sender() {
        let (db, _) = test_db();
        let group = db
            .create_group("alice", "trip", &["bob".into(), "carol".into()])
            .unwrap();
        let id = db.create_group_message(group, "alice", "bags packed?").unwrap();

        let recipients: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT recipient_id FROM group_message_receipts WHERE message_id = ?1 ORDER BY recipient_id",
                )?;
                let rows = stmt
                    .query_map([id], |r| r.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap();
        assert_eq!(recipients, vec!["bob".to_string(), "carol".to_string()]);
    }

    #[test]
    fn group_message_to_missing_group_rolls_back() {
        let (db, _) = test_db();
        let err = db.create_group_message(99, "alice", "hello?").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Entity::Group)));

        let stored: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM group_messages", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(stored, 0);
    }

    #[test]
    fn group_message_lookup_is_scoped_to_its_group() {
        let (db, _) = test_db();
        let first = db.create_group("alice", "one", &[]).unwrap();
        let second = db.create_group("alice", "two", &[]).unwrap();
        let id = db.create_group_message(first, "alice", "in one").unwrap();

        assert_eq!(db.get_group_message_in_group(first, id).unwrap().body, "in one");
        assert!(matches!(
            db.get_group_message_in_group(second, id),
            Err(StoreError::NotFound(Entity::Message))
        ));
        assert!(matches!(
            db.delete_group_message(second, id, "alice"),
            Err(StoreError::NotFound(Entity::Message))
        ));
    }

    #[test]
    fn deleted_group_message_disappears_from_listing() {
        let (db, clock) = test_db();
        let group = db.create_group("alice", "g", &["bob".into()]).unwrap();
        let keep = db.create_group_message(group, "bob", "stays").unwrap();
        clock.advance(Duration::seconds(1));
        let gone = db.create_group_message(group, "alice", "goes").unwrap();

        assert!(matches!(db.delete_group_message(group, gone, "bob"), Err(StoreError::Forbidden)));
        db.delete_group_message(group, gone, "alice").unwrap();
        db.delete_group_message(group, gone, "alice").unwrap();

        let listed = db.list_group_messages(group, Page::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep);
    }
}
