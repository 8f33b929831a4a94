use std::sync::Arc;

use etudiants_api::app::app;
use etudiants_api::config;
use etudiants_api::store::pg::PgEtudiantStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and PORT.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etudiants_api=debug,tower_http=info".into()),
        )
        .init();

    let config = config::config();

    // Connect and bootstrap the schema before accepting any traffic.
    let store = PgEtudiantStore::connect(&config.database_url, config.max_connections).await?;
    store.init_schema().await?;

    let app = app(Arc::new(store));

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("API Gestion Étudiants listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
