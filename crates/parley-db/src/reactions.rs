use rusqlite::{Connection, Row, params, types::ToSql};

use crate::Database;
use crate::clock::{encode_ts, ts_column};
use crate::error::{Entity, Result, StoreError};
use crate::messages::{direct_message_exists, query_group_message};
use crate::models::ReactionRow;
use crate::store::ReactionStore;

/// Direct and group reactions share a shape but live in separate tables.
#[derive(Debug, Clone, Copy)]
enum ReactionTable {
    Direct,
    Group,
}

impl ReactionTable {
    fn name(self) -> &'static str {
        match self {
            Self::Direct => "direct_message_reactions",
            Self::Group => "group_message_reactions",
        }
    }
}

impl ReactionStore for Database {
    fn set_direct_reaction(&self, message_id: i64, user_id: &str, reaction: &str) -> Result<()> {
        let now = encode_ts(self.now());
        self.with_conn(|conn| {
            if !direct_message_exists(conn, message_id)? {
                return Err(StoreError::NotFound(Entity::Message));
            }
            upsert(conn, ReactionTable::Direct, message_id, user_id, reaction, &now)
        })
    }

    fn remove_direct_reaction(&self, message_id: i64, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            if !direct_message_exists(conn, message_id)? {
                return Err(StoreError::NotFound(Entity::Message));
            }
            remove(conn, ReactionTable::Direct, message_id, user_id)
        })
    }

    fn list_direct_reactions(&self, message_id: i64) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            if !direct_message_exists(conn, message_id)? {
                return Err(StoreError::NotFound(Entity::Message));
            }
            query_reactions(conn, ReactionTable::Direct, &[message_id])
        })
    }

    fn direct_reactions_for_messages(&self, message_ids: &[i64]) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| query_reactions(conn, ReactionTable::Direct, message_ids))
    }

    fn set_group_reaction(
        &self,
        group_id: i64,
        message_id: i64,
        user_id: &str,
        reaction: &str,
    ) -> Result<()> {
        let now = encode_ts(self.now());
        self.with_conn(|conn| {
            // A message id from another group must not resolve here.
            query_group_message(conn, group_id, message_id)?;
            upsert(conn, ReactionTable::Group, message_id, user_id, reaction, &now)
        })
    }

    fn remove_group_reaction(&self, group_id: i64, message_id: i64, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            query_group_message(conn, group_id, message_id)?;
            remove(conn, ReactionTable::Group, message_id, user_id)
        })
    }

    fn list_group_reactions(&self, group_id: i64, message_id: i64) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            query_group_message(conn, group_id, message_id)?;
            query_reactions(conn, ReactionTable::Group, &[message_id])
        })
    }

    fn group_reactions_for_messages(&self, message_ids: &[i64]) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| query_reactions(conn, ReactionTable::Group, message_ids))
    }
}

fn upsert(
    conn: &Connection,
    table: ReactionTable,
    message_id: i64,
    user_id: &str,
    reaction: &str,
    now: &str,
) -> Result<()> {
    let sql = format!(
        "INSERT OR REPLACE INTO {} (message_id, user_id, reaction, created_at) VALUES (?1, ?2, ?3, ?4)",
        table.name()
    );
    conn.execute(&sql, params![message_id, user_id, reaction, now])?;
    Ok(())
}

/// Absence is not an error.
fn remove(conn: &Connection, table: ReactionTable, message_id: i64, user_id: &str) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE message_id = ?1 AND user_id = ?2", table.name());
    conn.execute(&sql, params![message_id, user_id])?;
    Ok(())
}

/// Batch-fetch reactions for a set of message IDs.
fn query_reactions(
    conn: &Connection,
    table: ReactionTable,
    message_ids: &[i64],
) -> Result<Vec<ReactionRow>> {
    if message_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT message_id, user_id, reaction, created_at FROM {} WHERE message_id IN ({})",
        table.name(),
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = message_ids.iter().map(|id| id as &dyn ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), reaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn reaction_from_row(row: &Row<'_>) -> rusqlite::Result<ReactionRow> {
    Ok(ReactionRow {
        message_id: row.get(0)?,
        user_id: row.get(1)?,
        reaction: row.get(2)?,
        created_at: ts_column(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MembershipStore, MessageStore};
    use crate::testing::test_db;

    fn pairs(rows: Vec<ReactionRow>) -> Vec<(String, String)> {
        let mut out: Vec<_> = rows.into_iter().map(|r| (r.user_id, r.reaction)).collect();
        out.sort();
        out
    }

    #[test]
    fn latest_reaction_wins() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "lunch?").unwrap();

        db.set_direct_reaction(id, "bob", "👍").unwrap();
        db.set_direct_reaction(id, "bob", "🍕").unwrap();
        db.set_direct_reaction(id, "alice", "😀").unwrap();

        assert_eq!(
            pairs(db.list_direct_reactions(id).unwrap()),
            vec![("alice".into(), "😀".into()), ("bob".into(), "🍕".into())]
        );
    }

    #[test]
    fn removing_absent_reaction_is_fine() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "hey").unwrap();

        db.remove_direct_reaction(id, "bob").unwrap();
        db.set_direct_reaction(id, "bob", "❤").unwrap();
        db.remove_direct_reaction(id, "bob").unwrap();
        assert!(db.list_direct_reactions(id).unwrap().is_empty());
    }

    #[test]
    fn reacting_to_unknown_direct_message_is_not_found() {
        let (db, _) = test_db();
        assert!(matches!(
            db.set_direct_reaction(404, "bob", "?"),
            Err(StoreError::NotFound(Entity::Message))
        ));
    }

    #[test]
    fn group_reactions_are_checked_against_the_group() {
        let (db, _) = test_db();
        let home = db.create_group("alice", "home", &["bob".into()]).unwrap();
        let other = db.create_group("carol", "other", &[]).unwrap();
        let id = db.create_group_message(home, "alice", "dinner at 8").unwrap();

        assert!(matches!(
            db.set_group_reaction(other, id, "carol", "👀"),
            Err(StoreError::NotFound(Entity::Message))
        ));
        assert!(matches!(
            db.list_group_reactions(other, id),
            Err(StoreError::NotFound(Entity::Message))
        ));

        db.set_group_reaction(home, id, "bob", "👍").unwrap();
        db.set_group_reaction(home, id, "bob", "👌").unwrap();
        assert_eq!(pairs(db.list_group_reactions(home, id).unwrap()), vec![("bob".into(), "👌".into())]);

        db.remove_group_reaction(home, id, "bob").unwrap();
        assert!(db.list_group_reactions(home, id).unwrap().is_empty());
    }

    #[test]
    fn batch_fetch_covers_every_requested_message() {
        let (db, _) = test_db();
        let first = db.create_direct_message("alice", "bob", "1").unwrap();
        let second = db.create_direct_message("alice", "bob", "2").unwrap();
        let third = db.create_direct_message("alice", "bob", "3").unwrap();
        db.set_direct_reaction(first, "bob", "a").unwrap();
        db.set_direct_reaction(second, "bob", "b").unwrap();
        db.set_direct_reaction(third, "bob", "c").unwrap();

        let mut got: Vec<i64> = db
            .direct_reactions_for_messages(&[first, third])
            .unwrap()
            .iter()
            .map(|r| r.message_id)
            .collect();
        got.sort();
        assert_eq!(got, vec![first, third]);
        assert!(db.direct_reactions_for_messages(&[]).unwrap().is_empty());
    }

    #[test]
    fn reactions_survive_message_deletion() {
        let (db, _) = test_db();
        let id = db.create_direct_message("alice", "bob", "soon gone").unwrap();
        db.set_direct_reaction(id, "bob", "😢").unwrap();
        db.delete_direct_message(id, "alice").unwrap();

        assert_eq!(db.list_direct_reactions(id).unwrap().len(), 1);
    }
}
