use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::Database;
use crate::clock::{encode_ts, ts_column};
use crate::error::{Entity, OptionalExt, Result, StoreError, is_constraint_violation};
use crate::models::GroupRow;
use crate::store::MembershipStore;

impl MembershipStore for Database {
    fn create_group(&self, creator: &str, name: &str, members: &[String]) -> Result<i64> {
        let now = encode_ts(self.now());

        let group_id = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO groups (name, photo_ref, created_at) VALUES (?1, '', ?2)",
                params![name, now],
            )?;
            let group_id = tx.last_insert_rowid();

            // Always add creator
            tx.execute(
                "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                params![group_id, creator],
            )?;

            let mut add = tx.prepare("INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)")?;
            for member in members {
                if member.is_empty() || member == creator {
                    continue;
                }
                add.execute(params![group_id, member])?;
            }
            Ok(group_id)
        })?;

        debug!("Group {} ({:?}) created by {}", group_id, name, creator);
        Ok(group_id)
    }

    fn add_member(&self, group_id: i64, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            if !group_exists(conn, group_id)? {
                return Err(StoreError::NotFound(Entity::Group));
            }
            if member_exists(conn, group_id, user_id)? {
                return Err(StoreError::AlreadyInGroup);
            }

            match conn.execute(
                "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                params![group_id, user_id],
            ) {
                Ok(_) => Ok(()),
                // Another writer got there between the check and the insert.
                Err(e) if is_constraint_violation(&e) => Err(StoreError::AlreadyInGroup),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn remove_member(&self, group_id: i64, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            if !group_exists(conn, group_id)? {
                return Err(StoreError::NotFound(Entity::Group));
            }

            let removed = conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
            )?;
            if removed == 0 {
                return Err(StoreError::NotInGroup);
            }
            Ok(())
        })
    }

    fn rename_group(&self, group_id: i64, name: &str) -> Result<()> {
        update_group(self, "UPDATE groups SET name = ?1 WHERE id = ?2", name, group_id)
    }

    fn set_group_photo(&self, group_id: i64, photo_ref: &str) -> Result<()> {
        update_group(self, "UPDATE groups SET photo_ref = ?1 WHERE id = ?2", photo_ref, group_id)
    }

    fn is_member(&self, group_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            if !group_exists(conn, group_id)? {
                return Err(StoreError::NotFound(Entity::Group));
            }
            member_exists(conn, group_id, user_id)
        })
    }

    fn get_group(&self, group_id: i64) -> Result<GroupRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, photo_ref, created_at FROM groups WHERE id = ?1",
                [group_id],
                group_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Group))
        })
    }

    fn list_groups_for_user(&self, user_id: &str) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.photo_ref, g.created_at
                 FROM groups g
                 INNER JOIN group_members gm ON gm.group_id = g.id
                 WHERE gm.user_id = ?1
                 ORDER BY g.created_at DESC, g.id DESC",
            )?;

            let rows = stmt
                .query_map([user_id], group_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    fn list_members(&self, group_id: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            if !group_exists(conn, group_id)? {
                return Err(StoreError::NotFound(Entity::Group));
            }

            let mut stmt =
                conn.prepare("SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY user_id")?;
            let members = stmt
                .query_map([group_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;

            Ok(members)
        })
    }

    fn group_photo(&self, group_id: i64) -> Result<String> {
        let group = self.get_group(group_id)?;
        if group.photo_ref.trim().is_empty() {
            return Err(StoreError::NotFound(Entity::Photo));
        }
        Ok(group.photo_ref)
    }
}

/// Single-statement update whose affected-row count doubles as the
/// existence check.
fn update_group(db: &Database, sql: &str, value: &str, group_id: i64) -> Result<()> {
    db.with_conn(|conn| {
        let updated = conn.execute(sql, params![value, group_id])?;
        if updated == 0 {
            return Err(StoreError::NotFound(Entity::Group));
        }
        Ok(())
    })
}

pub(crate) fn group_exists(conn: &Connection, group_id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM groups WHERE id = ?1", [group_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn member_exists(conn: &Connection, group_id: i64, user_id: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group_id, user_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        photo_ref: row.get(2)?,
        created_at: ts_column(row, 3)?,
    })
}
