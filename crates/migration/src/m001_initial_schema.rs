use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

// The partial unique index keeps at most one current snapshot per hostname.
const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS hostdata (
    id TEXT PRIMARY KEY NOT NULL,
    hostname TEXT NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0,
    is_dr INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    dismissed_at TEXT,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_hostdata_hostname_created
    ON hostdata(hostname, created_at);
CREATE INDEX IF NOT EXISTS idx_hostdata_archived_created
    ON hostdata(archived, created_at);
CREATE UNIQUE INDEX IF NOT EXISTS idx_hostdata_current_hostname
    ON hostdata(hostname) WHERE archived = 0;
";

const DOWN_SQL: &str = "
DROP INDEX IF EXISTS idx_hostdata_current_hostname;
DROP INDEX IF EXISTS idx_hostdata_archived_created;
DROP INDEX IF EXISTS idx_hostdata_hostname_created;
DROP TABLE IF EXISTS hostdata;
";
