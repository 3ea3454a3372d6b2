use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

/// Bring the schema up to date. Safe to call on every start.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id          TEXT PRIMARY KEY,
                nickname    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_photos (
                user_id     TEXT PRIMARY KEY,
                photo_ref   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS groups (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                photo_ref   TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS group_members (
                group_id    INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                PRIMARY KEY (group_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_group_members_user
                ON group_members(user_id);

            CREATE TABLE IF NOT EXISTS direct_messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id   TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_direct_messages_pair
                ON direct_messages(sender_id, receiver_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_direct_messages_receiver
                ON direct_messages(receiver_id, created_at);

            CREATE TABLE IF NOT EXISTS group_messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id    INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                sender_id   TEXT NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_group_messages_group
                ON group_messages(group_id, created_at);

            -- Tombstones: presence hides the message from every read path.
            CREATE TABLE IF NOT EXISTS direct_message_deletions (
                message_id  INTEGER PRIMARY KEY REFERENCES direct_messages(id) ON DELETE CASCADE,
                deleted_by  TEXT NOT NULL,
                deleted_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS group_message_deletions (
                message_id  INTEGER PRIMARY KEY REFERENCES group_messages(id) ON DELETE CASCADE,
                group_id    INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                deleted_by  TEXT NOT NULL,
                deleted_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS direct_message_reactions (
                message_id  INTEGER NOT NULL REFERENCES direct_messages(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                reaction    TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (message_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS group_message_reactions (
                message_id  INTEGER NOT NULL REFERENCES group_messages(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                reaction    TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (message_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS direct_message_receipts (
                message_id   INTEGER PRIMARY KEY REFERENCES direct_messages(id) ON DELETE CASCADE,
                recipient_id TEXT NOT NULL,
                received_at  TEXT NOT NULL,
                read_at      TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_direct_receipts_recipient
                ON direct_message_receipts(recipient_id, read_at);

            CREATE TABLE IF NOT EXISTS group_message_receipts (
                message_id   INTEGER NOT NULL REFERENCES group_messages(id) ON DELETE CASCADE,
                group_id     INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                recipient_id TEXT NOT NULL,
                received_at  TEXT NOT NULL,
                read_at      TEXT,
                PRIMARY KEY (message_id, recipient_id)
            );

            CREATE INDEX IF NOT EXISTS idx_group_receipts_recipient
                ON group_message_receipts(group_id, recipient_id, read_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_twice_is_harmless() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn all_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        for table in [
            "users",
            "user_photos",
            "groups",
            "group_members",
            "direct_messages",
            "group_messages",
            "direct_message_deletions",
            "group_message_deletions",
            "direct_message_reactions",
            "group_message_reactions",
            "direct_message_receipts",
            "group_message_receipts",
        ] {
            let found: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "missing table {table}");
        }
    }
}
