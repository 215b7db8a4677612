use sqlx::PgPool;
use tracing::info;

use super::StoreError;

/// Idempotent DDL, applied in order by `migrate`.
pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        password TEXT NOT NULL,
        name VARCHAR(255) NOT NULL DEFAULT '',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_staff BOOLEAN NOT NULL DEFAULT FALSE,
        is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT users_email_key UNIQUE (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        name VARCHAR(255) NOT NULL,
        persian_title VARCHAR(255) NOT NULL DEFAULT '',
        parent_category_id UUID NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT categories_user_fk FOREIGN KEY (user_id)
            REFERENCES users (id) ON DELETE CASCADE,
        CONSTRAINT categories_parent_category_fk FOREIGN KEY (parent_category_id)
            REFERENCES categories (id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        name VARCHAR(255) NOT NULL,
        description VARCHAR(2000) NOT NULL DEFAULT '',
        category_id UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT products_user_fk FOREIGN KEY (user_id)
            REFERENCES users (id) ON DELETE CASCADE,
        CONSTRAINT products_category_fk FOREIGN KEY (category_id)
            REFERENCES categories (id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS categories_user_id_idx ON categories (user_id)",
    "CREATE INDEX IF NOT EXISTS categories_parent_category_id_idx ON categories (parent_category_id)",
    "CREATE INDEX IF NOT EXISTS products_user_id_idx ON products (user_id)",
    "CREATE INDEX IF NOT EXISTS products_category_id_idx ON products (category_id)",
];

/// Map a foreign key constraint name to the API field it guards.
pub fn field_for_constraint(constraint: &str) -> &'static str {
    match constraint {
        "categories_parent_category_fk" => "parent_category",
        "products_category_fk" => "category",
        _ => "user",
    }
}

pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Applied {} schema statements", STATEMENTS.len());
    Ok(())
}
