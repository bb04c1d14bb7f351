use std::{net::SocketAddr, sync::Arc};

use playnotes::{app, config::parse_app_config, templates, AppContext};
use tracing as log;

async fn real_main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = parse_app_config()?;
    let addr = SocketAddr::from((config.interface_ipv4, config.port));

    let ctx = Arc::new(AppContext::new(config).await?);

    // Keep the watcher alive for as long as the server runs.
    let _watcher = if ctx.config.watch_templates {
        Some(templates::watch(ctx.clone())?)
    } else {
        None
    };

    let app = app(ctx);

    log::debug!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Since this function is under the tokio::main macro, rust-analyzer has issues with it. Put
    // the main in the real_main function instead.
    real_main().await
}
