pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use models::{Category, Product, User};
pub use postgres::PgStore;

pub const PARENT_CYCLE: &str = "A category cannot be its own ancestor.";

/// Errors from the catalog stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation on `field`
    #[error("{message}")]
    Conflict { field: &'static str, message: String },

    /// Foreign key points at a row that does not exist
    #[error("{message}")]
    InvalidReference { field: &'static str, message: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn duplicate_email() -> Self {
        StoreError::Conflict {
            field: "email",
            message: "user with this email already exists.".to_string(),
        }
    }

    pub fn parent_cycle() -> Self {
        StoreError::InvalidReference {
            field: "parent_category",
            message: PARENT_CYCLE.to_string(),
        }
    }

    pub fn missing_reference(field: &'static str, id: Uuid) -> Self {
        StoreError::InvalidReference {
            field,
            message: format!("Invalid pk \"{}\" - object does not exist.", id),
        }
    }
}

/// Persistence for users, categories and products.
///
/// Category and product methods take the owning user's id and only ever see
/// rows owned by that user. Deletes cascade: a user takes their categories and
/// products with them, a category takes its child categories and its products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    async fn insert_user(&self, user: &User) -> Result<User, StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// `email` must already be normalized
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Owned categories, name descending
    async fn list_categories(&self, owner: Uuid) -> Result<Vec<Category>, StoreError>;
    async fn find_category(&self, owner: Uuid, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn insert_category(&self, category: &Category) -> Result<Category, StoreError>;
    /// Scoped by `category.user_id`; `None` when no such owned row exists
    async fn update_category(&self, category: &Category) -> Result<Option<Category>, StoreError>;
    async fn delete_category(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError>;

    /// Owned products, name descending, optionally restricted to one category
    async fn list_products(&self, owner: Uuid, category: Option<Uuid>) -> Result<Vec<Product>, StoreError>;
    async fn find_product(&self, owner: Uuid, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn insert_product(&self, product: &Product) -> Result<Product, StoreError>;
    /// Scoped by `product.user_id`; `None` when no such owned row exists
    async fn update_product(&self, product: &Product) -> Result<Option<Product>, StoreError>;
    async fn delete_product(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError>;
}
