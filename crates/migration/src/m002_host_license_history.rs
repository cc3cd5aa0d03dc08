use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_host_license_history"
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

// Rows are never removed by snapshot cleanup.
const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS host_license_history (
    hostname TEXT NOT NULL,
    license_type_id TEXT NOT NULL,
    first_enabled_at TEXT NOT NULL,
    PRIMARY KEY (hostname, license_type_id)
);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS host_license_history;
";
