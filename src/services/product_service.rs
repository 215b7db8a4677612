use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::api::format::ProductPayload;
use crate::api::validate::{Validator, DESCRIPTION_MAX_LENGTH, NAME_MAX_LENGTH, REQUIRED};
use crate::database::{CatalogStore, Product};
use crate::error::ApiError;
use crate::middleware::auth::Identity;

/// Product CRUD restricted to the caller's own rows
pub struct ProductService<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> ProductService<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, identity: &Identity, category: Option<Uuid>) -> Result<Vec<Product>, ApiError> {
        Ok(self.store.list_products(identity.user_id, category).await?)
    }

    pub async fn retrieve(&self, identity: &Identity, id: Uuid) -> Result<Product, ApiError> {
        self.store
            .find_product(identity.user_id, id)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn create(&self, identity: &Identity, payload: ProductPayload) -> Result<Product, ApiError> {
        let mut v = Validator::new();
        let name = v.required_text("name", payload.name.as_ref(), NAME_MAX_LENGTH);
        let description = v.optional_text(
            "description",
            payload.description.as_ref(),
            DESCRIPTION_MAX_LENGTH,
        );
        let category = v.uuid("category", payload.category.as_ref());
        let category = self.check_category(identity, category, &mut v).await?;
        v.finish()?;

        let (Some(name), Some(description), Some(category_id)) = (name, description, category) else {
            return Err(ApiError::internal_server_error("Validation state inconsistent"));
        };

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            user_id: identity.user_id,
            name,
            description,
            category_id,
            created_at: now,
            updated_at: now,
        };

        let product = self.store.insert_product(&product).await?;
        info!("User {} created product {} in category {}", identity.user_id, product.id, category_id);
        Ok(product)
    }

    /// `partial` applies only supplied fields (PATCH); otherwise `name` and
    /// `category` are required and `description` resets when omitted (PUT).
    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        payload: ProductPayload,
        partial: bool,
    ) -> Result<Product, ApiError> {
        let mut product = self.retrieve(identity, id).await?;

        let mut v = Validator::new();
        let name = match (&payload.name, partial) {
            (None, true) => None,
            (value, _) => v.required_text("name", value.as_ref(), NAME_MAX_LENGTH),
        };
        let description = match (&payload.description, partial) {
            (None, true) => None,
            (value, _) => v.optional_text("description", value.as_ref(), DESCRIPTION_MAX_LENGTH),
        };
        let category = match (&payload.category, partial) {
            (None, true) => None,
            (value, _) => match v.uuid("category", value.as_ref()) {
                Some(id) if id == product.category_id => Some(id),
                id => self.check_category(identity, id, &mut v).await?,
            },
        };
        v.finish()?;

        if let Some(name) = name {
            product.name = name;
        }
        if let Some(description) = description {
            product.description = description;
        }
        if let Some(category_id) = category {
            product.category_id = category_id;
        }
        product.updated_at = Utc::now();

        let product = self.store.update_product(&product).await?.ok_or_else(not_found)?;
        info!("User {} updated product {}", identity.user_id, product.id);
        Ok(product)
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), ApiError> {
        if !self.store.delete_product(identity.user_id, id).await? {
            return Err(not_found());
        }
        info!("User {} deleted product {}", identity.user_id, id);
        Ok(())
    }

    /// Category is required and must belong to the caller. A malformed id has
    /// already been reported by the validator and keeps that message.
    async fn check_category(
        &self,
        identity: &Identity,
        category: Option<Uuid>,
        v: &mut Validator,
    ) -> Result<Option<Uuid>, ApiError> {
        let Some(category) = category else {
            v.add("category", REQUIRED);
            return Ok(None);
        };
        match self.store.find_category(identity.user_id, category).await? {
            Some(found) => Ok(Some(found.id)),
            None => {
                v.add(
                    "category",
                    format!("Invalid pk \"{}\" - object does not exist.", category),
                );
                Ok(None)
            }
        }
    }
}

fn not_found() -> ApiError {
    ApiError::not_found("Not found.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::format::CategoryPayload;
    use crate::database::{MemoryStore, User};
    use crate::services::CategoryService;
    use serde_json::json;

    async fn owner(store: &MemoryStore, email: &str) -> Identity {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.into(),
            password: "hash".into(),
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        };
        Identity::from(&store.insert_user(&user).await.unwrap())
    }

    async fn category(store: &MemoryStore, identity: &Identity, name: &str) -> Uuid {
        let payload = CategoryPayload {
            name: Some(name.into()),
            ..Default::default()
        };
        CategoryService::new(store).create(identity, payload).await.unwrap().id
    }

    fn payload(name: &str, category: Option<Uuid>) -> ProductPayload {
        ProductPayload {
            name: Some(name.into()),
            description: None,
            category: category.map(|id| json!(id)),
        }
    }

    #[tokio::test]
    async fn create_defaults_description() {
        let store = MemoryStore::new();
        let me = owner(&store, "a@x.com").await;
        let hv = category(&store, &me, "HV").await;
        let products = ProductService::new(&store);

        let p = products.create(&me, payload("Kale", Some(hv))).await.unwrap();
        assert_eq!(p.description, "");
        assert_eq!(p.user_id, me.user_id);
        assert_eq!(p.category_id, hv);
    }

    #[tokio::test]
    async fn category_is_required_and_must_be_owned() {
        let store = MemoryStore::new();
        let a = owner(&store, "a@x.com").await;
        let b = owner(&store, "b@x.com").await;
        let foreign = category(&store, &a, "HV").await;
        let products = ProductService::new(&store);

        let err = products.create(&b, payload("Kale", None)).await.unwrap_err();
        assert_eq!(err.field_errors().unwrap()["category"], REQUIRED);

        let err = products.create(&b, payload("Kale", Some(foreign))).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("category"));
        assert!(products.list(&b, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_category_and_sorts_descending() {
        let store = MemoryStore::new();
        let me = owner(&store, "a@x.com").await;
        let hv = category(&store, &me, "HV").await;
        let fruit = category(&store, &me, "Fruit").await;
        let products = ProductService::new(&store);

        for name in ["Cabbage", "Kale", "Lettuce"] {
            products.create(&me, payload(name, Some(hv))).await.unwrap();
        }
        products.create(&me, payload("Apple", Some(fruit))).await.unwrap();

        let names: Vec<String> = products
            .list(&me, Some(hv))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Lettuce", "Kale", "Cabbage"]);
        assert_eq!(products.list(&me, None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn patch_moves_between_owned_categories() {
        let store = MemoryStore::new();
        let a = owner(&store, "a@x.com").await;
        let b = owner(&store, "b@x.com").await;
        let hv = category(&store, &a, "HV").await;
        let fruit = category(&store, &a, "Fruit").await;
        let foreign = category(&store, &b, "Other").await;
        let products = ProductService::new(&store);

        let p = products.create(&a, payload("Kale", Some(hv))).await.unwrap();

        let moved = ProductPayload { category: Some(json!(fruit)), ..Default::default() };
        let updated = products.update(&a, p.id, moved, true).await.unwrap();
        assert_eq!(updated.category_id, fruit);
        assert_eq!(updated.name, "Kale");

        let stolen = ProductPayload { category: Some(json!(foreign)), ..Default::default() };
        assert!(products.update(&a, p.id, stolen, true).await.is_err());
    }

    #[tokio::test]
    async fn malformed_category_is_a_field_error() {
        let store = MemoryStore::new();
        let me = owner(&store, "a@x.com").await;
        let products = ProductService::new(&store);

        let bad = ProductPayload {
            name: Some("Kale".into()),
            description: Some(json!(3)),
            category: Some(json!("abc")),
        };
        let err = products.create(&me, bad).await.unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields["category"].contains("not a valid UUID"));
        assert!(fields.contains_key("description"));
    }

    #[tokio::test]
    async fn put_requires_full_representation() {
        let store = MemoryStore::new();
        let me = owner(&store, "a@x.com").await;
        let hv = category(&store, &me, "HV").await;
        let products = ProductService::new(&store);

        let p = products.create(&me, payload("Kale", Some(hv))).await.unwrap();
        let err = products
            .update(&me, p.id, ProductPayload { name: Some("Kale".into()), ..Default::default() }, false)
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("category"));
    }

    #[tokio::test]
    async fn other_users_product_is_not_found() {
        let store = MemoryStore::new();
        let a = owner(&store, "a@x.com").await;
        let b = owner(&store, "b@x.com").await;
        let hv = category(&store, &a, "HV").await;
        let products = ProductService::new(&store);

        let p = products.create(&a, payload("Kale", Some(hv))).await.unwrap();
        assert!(matches!(products.retrieve(&b, p.id).await, Err(ApiError::NotFound(_))));
        assert!(matches!(products.delete(&b, p.id).await, Err(ApiError::NotFound(_))));
        assert!(products.retrieve(&a, p.id).await.is_ok());
    }
}
