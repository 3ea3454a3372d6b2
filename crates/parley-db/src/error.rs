use std::fmt;

/// What a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Group,
    Message,
    Photo,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Message => "message",
            Self::Photo => "photo",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Entity),

    /// A message action attempted by someone other than its sender.
    #[error("forbidden message action")]
    Forbidden,

    #[error("user already in group")]
    AlreadyInGroup,

    #[error("user not in group")]
    NotInGroup,

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
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

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;

    #[test]
    fn duplicate_membership_insert_is_a_constraint_violation() {
        let (db, _) = test_db();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO groups (name, photo_ref, created_at) VALUES ('g', '', '2026-03-01T09:00:00.000000Z')",
                [],
            )?;
            let group_id = conn.last_insert_rowid();
            let insert = "INSERT INTO group_members (group_id, user_id) VALUES (?1, 'bob')";
            conn.execute(insert, [group_id])?;

            let err = conn.execute(insert, [group_id]).unwrap_err();
            assert!(is_constraint_violation(&err));

            let err = conn.execute("INSERT INTO no_such_table VALUES (1)", []).unwrap_err();
            assert!(!is_constraint_violation(&err));
            assert!(!is_constraint_violation(&rusqlite::Error::QueryReturnedNoRows));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn optional_maps_only_missing_rows_to_none() {
        let (db, _) = test_db();
        db.with_conn(|conn| {
            let none: Option<i64> = conn
                .query_row("SELECT 1 FROM groups WHERE id = -1", [], |r| r.get(0))
                .optional()?;
            assert_eq!(none, None);

            let err = conn
                .query_row("SELECT nope FROM groups", [], |r| r.get::<_, i64>(0))
                .optional()
                .unwrap_err();
            assert!(matches!(err, StoreError::Storage(_)));
            Ok(())
        })
        .unwrap();
    }
}
