use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::format::CategoryPayload;
use crate::api::validate::{Validator, NAME_MAX_LENGTH, PERSIAN_TITLE_MAX_LENGTH};
use crate::database::{CatalogStore, Category, Product, PARENT_CYCLE};
use crate::error::ApiError;
use crate::middleware::auth::Identity;

/// Category CRUD restricted to the caller's own rows
pub struct CategoryService<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> CategoryService<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<Category>, ApiError> {
        Ok(self.store.list_categories(identity.user_id).await?)
    }

    pub async fn retrieve(&self, identity: &Identity, id: Uuid) -> Result<Category, ApiError> {
        self.store
            .find_category(identity.user_id, id)
            .await?
            .ok_or_else(not_found)
    }

    /// Category plus the caller's products filed under it
    pub async fn retrieve_with_products(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<(Category, Vec<Product>), ApiError> {
        let category = self.retrieve(identity, id).await?;
        let products = self.store.list_products(identity.user_id, Some(category.id)).await?;
        Ok((category, products))
    }

    pub async fn create(&self, identity: &Identity, payload: CategoryPayload) -> Result<Category, ApiError> {
        let mut v = Validator::new();
        let name = v.required_text("name", payload.name.as_ref(), NAME_MAX_LENGTH);
        let persian_title = v.optional_text(
            "persian_title",
            payload.persian_title.as_ref(),
            PERSIAN_TITLE_MAX_LENGTH,
        );
        let parent = v.uuid(
            "parent_category",
            payload.parent_category.as_ref().and_then(Option::as_ref),
        );
        self.check_parent(identity, None, parent, &mut v).await?;
        v.finish()?;

        let (Some(name), Some(persian_title)) = (name, persian_title) else {
            return Err(ApiError::internal_server_error("Validation state inconsistent"));
        };

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            user_id: identity.user_id,
            name,
            persian_title,
            parent_category_id: parent,
            created_at: now,
            updated_at: now,
        };

        let category = self.store.insert_category(&category).await?;
        info!("User {} created category {}", identity.user_id, category.id);
        Ok(category)
    }

    /// `partial` applies only supplied fields (PATCH); otherwise `name` is
    /// required and omitted optional fields reset (PUT).
    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        payload: CategoryPayload,
        partial: bool,
    ) -> Result<Category, ApiError> {
        let mut category = self.retrieve(identity, id).await?;

        let mut v = Validator::new();
        let name = match (&payload.name, partial) {
            (None, true) => None,
            (value, _) => v.required_text("name", value.as_ref(), NAME_MAX_LENGTH),
        };
        let persian_title = match (&payload.persian_title, partial) {
            (None, true) => None,
            (value, _) => v.optional_text("persian_title", value.as_ref(), PERSIAN_TITLE_MAX_LENGTH),
        };
        let parent = match (&payload.parent_category, partial) {
            (None, true) => category.parent_category_id,
            (value, _) => v.uuid("parent_category", value.as_ref().and_then(Option::as_ref)),
        };
        if parent != category.parent_category_id {
            self.check_parent(identity, Some(id), parent, &mut v).await?;
        }
        v.finish()?;

        if let Some(name) = name {
            category.name = name;
        }
        if let Some(persian_title) = persian_title {
            category.persian_title = persian_title;
        }
        category.parent_category_id = parent;
        category.updated_at = Utc::now();

        let category = self.store.update_category(&category).await?.ok_or_else(not_found)?;
        info!("User {} updated category {}", identity.user_id, category.id);
        Ok(category)
    }

    /// Removes the category, its descendants and their products
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), ApiError> {
        if !self.store.delete_category(identity.user_id, id).await? {
            return Err(not_found());
        }
        info!("User {} deleted category {} (cascading)", identity.user_id, id);
        Ok(())
    }

    /// The parent must be one of the caller's categories and must not sit
    /// below `target` in the tree. The store repeats the cycle check atomically.
    async fn check_parent(
        &self,
        identity: &Identity,
        target: Option<Uuid>,
        parent: Option<Uuid>,
        v: &mut Validator,
    ) -> Result<(), ApiError> {
        let Some(parent) = parent else {
            return Ok(());
        };

        let Some(mut current) = self.store.find_category(identity.user_id, parent).await? else {
            v.add(
                "parent_category",
                format!("Invalid pk \"{}\" - object does not exist.", parent),
            );
            return Ok(());
        };

        let Some(target) = target else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        loop {
            if current.id == target {
                debug!("Rejected parent {} for category {}: cycle", parent, target);
                v.add("parent_category", PARENT_CYCLE);
                return Ok(());
            }
            if !seen.insert(current.id) {
                return Ok(());
            }
            match current.parent_category_id {
                Some(next) => match self.store.find_category(identity.user_id, next).await? {
                    Some(category) => current = category,
                    None => return Ok(()),
                },
                None => return Ok(()),
            }
        }
    }
}

fn not_found() -> ApiError {
    ApiError::not_found("Not found.")
}
