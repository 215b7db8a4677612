use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::CatalogStore;
use crate::services::{CategoryService, ProductService, UserService};

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(self.store.as_ref(), &self.config.security)
    }

    pub fn categories(&self) -> CategoryService<'_> {
        CategoryService::new(self.store.as_ref())
    }

    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self.store.as_ref())
    }
}
