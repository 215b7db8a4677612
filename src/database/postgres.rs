use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::models::{Category, Product, User};
use super::schema::field_for_constraint;
use super::{CatalogStore, StoreError};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Postgres-backed store. Cascades are enforced by the foreign keys in `schema`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translate constraint violations into domain errors
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return StoreError::duplicate_email(),
            Some(FOREIGN_KEY_VIOLATION) => {
                let field = field_for_constraint(db_err.constraint().unwrap_or_default());
                return StoreError::InvalidReference {
                    field,
                    message: "Invalid pk - object does not exist.".to_string(),
                };
            }
            _ => {}
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password, name, is_active, is_staff, is_superuser, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, password = $3, name = $4, is_active = $5,
                is_staff = $6, is_superuser = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| StoreError::NotFound(format!("User {} not found", user.id)))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self, owner: Uuid) -> Result<Vec<Category>, StoreError> {
        debug!("Listing categories for owner {}", owner);
        let rows = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE user_id = $1 ORDER BY name DESC, id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_category(&self, owner: Uuid, id: Uuid) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_category(&self, category: &Category) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, user_id, name, persian_title, parent_category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(category.id)
        .bind(category.user_id)
        .bind(&category.name)
        .bind(&category.persian_title)
        .bind(category.parent_category_id)
        .bind(category.created_at)
        .bind(category.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_category(&self, category: &Category) -> Result<Option<Category>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serializes tree edits per owner so the cycle check below sees committed parents
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text, 0))")
            .bind(category.user_id)
            .execute(&mut *tx)
            .await?;

        if let Some(parent) = category.parent_category_id {
            let cycle: bool = sqlx::query_scalar(
                r#"
                WITH RECURSIVE ancestors AS (
                    SELECT id, parent_category_id FROM categories WHERE id = $1
                    UNION
                    SELECT c.id, c.parent_category_id
                    FROM categories c JOIN ancestors a ON c.id = a.parent_category_id
                )
                SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)
                "#,
            )
            .bind(parent)
            .bind(category.id)
            .fetch_one(&mut *tx)
            .await?;
            if cycle {
                debug!("Refused parent {} for category {}: cycle", parent, category.id);
                return Err(StoreError::parent_cycle());
            }
        }

        let updated = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $3, persian_title = $4, parent_category_id = $5, updated_at = $6
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(category.id)
        .bind(category.user_id)
        .bind(&category.name)
        .bind(&category.persian_title)
        .bind(category.parent_category_id)
        .bind(category.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_category(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self, owner: Uuid, category: Option<Uuid>) -> Result<Vec<Product>, StoreError> {
        debug!("Listing products for owner {} (category {:?})", owner, category);
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE user_id = $1 AND ($2::uuid IS NULL OR category_id = $2)
            ORDER BY name DESC, id
            "#,
        )
        .bind(owner)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_product(&self, owner: Uuid, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_product(&self, product: &Product) -> Result<Product, StoreError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, user_id, name, description, category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(product.user_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_product(&self, product: &Product) -> Result<Option<Product>, StoreError> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $3, description = $4, category_id = $5, updated_at = $6
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(product.user_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id)
        .bind(product.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn delete_product(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
