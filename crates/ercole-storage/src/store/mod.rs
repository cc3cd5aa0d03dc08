use std::path::Path;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use crate::error::Result;

pub mod hostdata;

/// Unified access to the hostdata database.
///
/// All methods are `async fn` on top of SeaORM + SQLite. Schema migrations
/// run when the store is opened.
pub struct HostDataStore {
    pub(crate) db: DatabaseConnection,
}

impl HostDataStore {
    /// Connects to `db_url` and brings the schema up to date.
    ///
    /// - `db_url`: full connection URL, e.g. `sqlite:///var/lib/ercole/ercole.db?mode=rwc`
    /// - `data_dir`: created if missing, so that SQLite can create the file in it
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        // WAL only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized hostdata store (SeaORM)");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
