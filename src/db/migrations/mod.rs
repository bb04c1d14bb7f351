use sqlx::{AnyConnection, Executor as _};
use tracing as log;

mod m1;

/// Version the schema ends up at once all migrations ran.
pub(crate) const LATEST_VERSION: i64 = 1;

async fn read_latest_migration(conn: &mut AnyConnection) -> anyhow::Result<i64> {
    let version: Result<(i64,), _> = sqlx::query_as("SELECT version FROM migrations;")
        .fetch_one(&mut *conn)
        .await;

    let version = match version {
        Ok((version,)) => version,
        Err(err) => {
            log::debug!("error when reading latest migration version: {err}, attempting to create the migrations table...");

            create_migration_table(conn).await?;

            let (version,): (i64,) = sqlx::query_as("SELECT version FROM migrations;")
                .fetch_one(&mut *conn)
                .await?;

            version
        }
    };

    Ok(version)
}

async fn create_migration_table(conn: &mut AnyConnection) -> anyhow::Result<()> {
    conn.execute(
        r#"
        CREATE TABLE migrations (
            version BIGINT NOT NULL
        );"#,
    )
    .await?;

    conn.execute("INSERT INTO migrations (version) VALUES (0);")
        .await?;

    Ok(())
}

pub(super) async fn run_migrations(conn: &mut AnyConnection) -> anyhow::Result<()> {
    let before = read_latest_migration(conn).await?;

    m1::run(conn).await?;

    if before < LATEST_VERSION {
        log::debug!("database migrated from version {before} to {LATEST_VERSION}");
    }
    Ok(())
}
