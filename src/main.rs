use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use catalog_api::config::{self, AppConfig};
use catalog_api::database::{schema, CatalogStore, DatabaseManager, MemoryStore, PgStore};
use catalog_api::{app, AppState};

#[derive(Parser)]
#[command(name = "catalog-api", version, about = "Catalog API server")]
struct Args {
    #[arg(long, help = "Keep all data in memory instead of Postgres")]
    memory: bool,

    #[arg(long, help = "Listen port (overrides API_PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_api=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let config: AppConfig = config::config().clone();
    config.validate()?;
    info!("Starting Catalog API in {:?} mode", config.environment);
    if catalog_api::is_development!() {
        warn!("Development defaults active; set APP_ENV and SECURITY_JWT_SECRET for deployments");
    }

    let store = open_store(&config, args.memory).await?;
    let port = args.port.unwrap_or(config.api.port);

    app::serve(AppState::new(store, config), port).await
}

async fn open_store(config: &AppConfig, memory: bool) -> anyhow::Result<Arc<dyn CatalogStore>> {
    if memory || config.database.url.is_none() {
        if !memory {
            warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
        }
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = DatabaseManager::connect(&config.database).await?;
    schema::migrate(&pool).await?;
    Ok(Arc::new(PgStore::new(pool)))
}
