use dotenvy::dotenv;
use guild_buddy::{
    bot,
    config::{app, database},
    errors::{Error, Result},
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Env vars can also be set externally
    dotenv().ok();

    let app_config = app::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    info!(
        prefix_secs = app_config.reconcile.prefix_interval().as_secs(),
        filter_secs = app_config.reconcile.filter_interval().as_secs(),
        units_secs = app_config.reconcile.units_interval().as_secs(),
        "Configuration loaded"
    );

    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database tables ready"))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, app_config, db).await
}
