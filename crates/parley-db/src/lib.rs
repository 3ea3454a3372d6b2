pub mod clock;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod membership;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reactions;
pub mod receipts;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Entity, Result, StoreError};
pub use store::{
    ChatStore, ConversationStore, DirectoryStore, MembershipStore, MessageStore,
    NicknameResolver, ReactionStore, ReceiptStore,
};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// The single storage handle. Created once at startup and shared behind an
/// `Arc`; every component operation goes through it.
pub struct Database {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    nicknames: Option<Arc<dyn NicknameResolver>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self::from_conn(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self::from_conn(conn))
    }

    fn from_conn(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
            nicknames: None,
        }
    }

    /// Replace the clock every stored timestamp is taken from.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve display names through an external service instead of the
    /// built-in user directory.
    pub fn with_nickname_resolver(mut self, resolver: Arc<dyn NicknameResolver>) -> Self {
        self.nicknames = Some(resolver);
        self
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn nickname_resolver(&self) -> Option<&Arc<dyn NicknameResolver>> {
        self.nicknames.as_ref()
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one transaction. Commits when `f` returns `Ok`; any
    /// error drops the transaction, which rolls it back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}
