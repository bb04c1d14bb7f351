use anyhow::Context as _;
use sqlx::{AnyConnection, Executor as _};

use super::read_latest_migration;

/// Migration 1: initial version of the database.
pub(super) async fn run(conn: &mut AnyConnection) -> anyhow::Result<()> {
    let latest_version = read_latest_migration(conn).await?;
    if latest_version >= 1 {
        return Ok(());
    }

    conn.execute(
        r#"
            CREATE TABLE comments (
                id INTEGER PRIMARY KEY,
                play_id INTEGER NOT NULL UNIQUE,
                content VARCHAR(2048) NOT NULL CHECK (length(content) <= 2048)
            );
        "#,
    )
    .await?;

    conn.execute("UPDATE migrations SET version = 1 WHERE version = 0;")
        .await
        .context("when upgrading db version number")?;

    Ok(())
}
