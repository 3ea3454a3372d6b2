use rusqlite::params;

use crate::Database;
use crate::clock::encode_ts;
use crate::error::{Entity, OptionalExt, Result, StoreError};
use crate::store::DirectoryStore;

impl DirectoryStore for Database {
    fn register_user(&self, user_id: &str) -> Result<bool> {
        let now = encode_ts(self.now());
        self.with_conn(|conn| {
            // The nickname starts out as the identifier itself.
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, nickname, created_at) VALUES (?1, ?1, ?2)",
                params![user_id, now],
            )?;
            Ok(inserted > 0)
        })
    }

    fn set_nickname(&self, user_id: &str, nickname: &str) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET nickname = ?1 WHERE id = ?2",
                params![nickname, user_id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(Entity::User));
            }
            Ok(())
        })
    }

    fn nickname(&self, user_id: &str) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT nickname FROM users WHERE id = ?1", [user_id], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or(StoreError::NotFound(Entity::User))
        })
    }

    fn user_exists(&self, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn set_user_photo(&self, user_id: &str, photo_ref: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO user_photos (user_id, photo_ref) VALUES (?1, ?2)",
                params![user_id, photo_ref],
            )?;
            Ok(())
        })
    }

    fn user_photo(&self, user_id: &str) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT photo_ref FROM user_photos WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Photo))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;

    #[test]
    fn register_then_rename() {
        let (db, _) = test_db();
        assert!(db.register_user("u1").unwrap());
        assert!(!db.register_user("u1").unwrap());
        assert_eq!(DirectoryStore::nickname(&db, "u1").unwrap(), "u1");

        db.set_nickname("u1", "Uma").unwrap();
        assert_eq!(DirectoryStore::nickname(&db, "u1").unwrap(), "Uma");
        assert!(db.user_exists("u1").unwrap());
        assert!(!db.user_exists("u2").unwrap());
    }

    #[test]
    fn unknown_users_are_not_found() {
        let (db, _) = test_db();
        assert!(matches!(db.set_nickname("ghost", "Casper"), Err(StoreError::NotFound(Entity::User))));
        assert!(matches!(
            DirectoryStore::nickname(&db, "ghost"),
            Err(StoreError::NotFound(Entity::User))
        ));
    }

    #[test]
    fn photo_reference_upserts() {
        let (db, _) = test_db();
        assert!(matches!(db.user_photo("u1"), Err(StoreError::NotFound(Entity::Photo))));
        db.set_user_photo("u1", "users/u1/a.png").unwrap();
        db.set_user_photo("u1", "users/u1/b.png").unwrap();
        assert_eq!(db.user_photo("u1").unwrap(), "users/u1/b.png");
    }
}
