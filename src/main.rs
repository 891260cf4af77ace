use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use finnest::app::{build_app, AppState};
use finnest::config::AppConfig;
use finnest::data;
use finnest::parser::HeuristicParser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();

    // Database configuration
    let pool = data::build_pool(&config.database_url, config.db_pool_size, config.store_timeout)
        .context("Failed to create DB pool")?;
    data::init_schema(&pool).context("Failed to initialise database schema")?;

    let state = AppState::new(pool, Arc::new(HeuristicParser::new()), &config);
    let app = build_app(state, &config);

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr()))?;

    log::info!("Server running on http://{}", config.bind_addr());
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
