use crate::cli::{utils, OutputFormat};
use crate::config;
use crate::database::{schema, DatabaseManager};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = utils::connect_store(config::config()).await?;
    schema::migrate(store.pool()).await?;
    DatabaseManager::close(store.pool().clone()).await;

    utils::output_success(output_format, "Schema is up to date", None)
}
