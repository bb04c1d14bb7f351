use anyhow::Context as _;
use sqlx::{AnyConnection, Connection};

mod migrations;
pub mod models;

pub async fn open(url: &str) -> anyhow::Result<AnyConnection> {
    let mut conn = AnyConnection::connect(url)
        .await
        .context("when opening database")?;

    migrations::run_migrations(&mut conn).await?;

    Ok(conn)
}
