use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Category, Product, User};
use super::{CatalogStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn check_parent(&self, category: &Category) -> Result<(), StoreError> {
        match category.parent_category_id {
            Some(parent) if !self.categories.contains_key(&parent) => {
                Err(StoreError::missing_reference("parent_category", parent))
            }
            _ => Ok(()),
        }
    }

    /// Whether hanging `target` under `parent` would close a loop
    fn creates_cycle(&self, target: Uuid, parent: Uuid) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(parent);
        while let Some(id) = current {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.categories.get(&id).and_then(|c| c.parent_category_id);
        }
        false
    }

    fn check_category(&self, product: &Product) -> Result<(), StoreError> {
        if self.categories.contains_key(&product.category_id) {
            Ok(())
        } else {
            Err(StoreError::missing_reference("category", product.category_id))
        }
    }

    /// Remove categories, their descendants, and every product filed under them
    fn remove_categories(&mut self, roots: Vec<Uuid>) {
        let mut pending = roots;
        while let Some(id) = pending.pop() {
            if self.categories.remove(&id).is_none() {
                continue;
            }
            pending.extend(
                self.categories
                    .values()
                    .filter(|c| c.parent_category_id == Some(id))
                    .map(|c| c.id),
            );
            self.products.retain(|_, p| p.category_id != id);
        }
    }
}

/// Store held entirely in process memory. Used for local runs and tests;
/// mirrors the cascade rules of the Postgres schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_descending<T>(rows: &mut [T], key: impl Fn(&T) -> (&str, Uuid)) {
    rows.sort_by(|a, b| {
        let (a_name, a_id) = key(a);
        let (b_name, b_id) = key(b);
        b_name.cmp(a_name).then(a_id.cmp(&b_id))
    });
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::duplicate_email());
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::NotFound(format!("User {} not found", user.id)));
        }
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::duplicate_email());
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<Uuid> = tables
            .categories
            .values()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        tables.remove_categories(owned);
        tables.products.retain(|_, p| p.user_id != id);
        Ok(true)
    }

    async fn list_categories(&self, owner: Uuid) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.user_id == owner)
            .cloned()
            .collect();
        name_descending(&mut rows, |c| (c.name.as_str(), c.id));
        Ok(rows)
    }

    async fn find_category(&self, owner: Uuid, id: Uuid) -> Result<Option<Category>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .get(&id)
            .filter(|c| c.user_id == owner)
            .cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&category.user_id) {
            return Err(StoreError::missing_reference("user", category.user_id));
        }
        tables.check_parent(category)?;
        tables.categories.insert(category.id, category.clone());
        Ok(category.clone())
    }

    async fn update_category(&self, category: &Category) -> Result<Option<Category>, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .categories
            .get(&category.id)
            .is_some_and(|c| c.user_id == category.user_id);
        if !owned {
            return Ok(None);
        }
        tables.check_parent(category)?;
        if let Some(parent) = category.parent_category_id {
            if tables.creates_cycle(category.id, parent) {
                return Err(StoreError::parent_cycle());
            }
        }
        tables.categories.insert(category.id, category.clone());
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables.categories.get(&id).is_some_and(|c| c.user_id == owner);
        if owned {
            tables.remove_categories(vec![id]);
        }
        Ok(owned)
    }

    async fn list_products(&self, owner: Uuid, category: Option<Uuid>) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Product> = tables
            .products
            .values()
            .filter(|p| p.user_id == owner)
            .filter(|p| category.map_or(true, |c| p.category_id == c))
            .cloned()
            .collect();
        name_descending(&mut rows, |p| (p.name.as_str(), p.id));
        Ok(rows)
    }

    async fn find_product(&self, owner: Uuid, id: Uuid) -> Result<Option<Product>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .get(&id)
            .filter(|p| p.user_id == owner)
            .cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&product.user_id) {
            return Err(StoreError::missing_reference("user", product.user_id));
        }
        tables.check_category(product)?;
        tables.products.insert(product.id, product.clone());
        Ok(product.clone())
    }

    async fn update_product(&self, product: &Product) -> Result<Option<Product>, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .products
            .get(&product.id)
            .is_some_and(|p| p.user_id == product.user_id);
        if !owned {
            return Ok(None);
        }
        tables.check_category(product)?;
        tables.products.insert(product.id, product.clone());
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables.products.get(&id).is_some_and(|p| p.user_id == owner);
        if owned {
            tables.products.remove(&id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: "hash".to_string(),
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn category(owner: Uuid, name: &str, parent: Option<Uuid>) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::new_v4(),
            user_id: owner,
            name: name.to_string(),
            persian_title: String::new(),
            parent_category_id: parent,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(owner: Uuid, name: &str, category_id: Uuid) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            user_id: owner,
            name: name.to_string(),
            description: String::new(),
            category_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@x.com")).await.unwrap();
        let err = store.insert_user(&user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "email", .. }));
    }

    #[tokio::test]
    async fn deleting_category_cascades_to_children_and_products() {
        let store = MemoryStore::new();
        let owner = store.insert_user(&user("a@x.com")).await.unwrap();

        let root = store.insert_category(&category(owner.id, "Root", None)).await.unwrap();
        let child = store.insert_category(&category(owner.id, "Child", Some(root.id))).await.unwrap();
        let grandchild = store
            .insert_category(&category(owner.id, "Grandchild", Some(child.id)))
            .await
            .unwrap();
        let other = store.insert_category(&category(owner.id, "Other", None)).await.unwrap();

        store.insert_product(&product(owner.id, "Deep", grandchild.id)).await.unwrap();
        store.insert_product(&product(owner.id, "Kept", other.id)).await.unwrap();

        assert!(store.delete_category(owner.id, root.id).await.unwrap());

        let categories = store.list_categories(owner.id).await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, other.id);

        let products = store.list_products(owner.id, None).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Kept");
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_owned_rows() {
        let store = MemoryStore::new();
        let a = store.insert_user(&user("a@x.com")).await.unwrap();
        let b = store.insert_user(&user("b@x.com")).await.unwrap();

        let a_cat = store.insert_category(&category(a.id, "A", None)).await.unwrap();
        store.insert_product(&product(a.id, "A1", a_cat.id)).await.unwrap();
        let b_cat = store.insert_category(&category(b.id, "B", None)).await.unwrap();
        store.insert_product(&product(b.id, "B1", b_cat.id)).await.unwrap();

        assert!(store.delete_user(a.id).await.unwrap());
        assert!(store.list_categories(a.id).await.unwrap().is_empty());
        assert!(store.list_products(a.id, None).await.unwrap().is_empty());
        assert_eq!(store.list_categories(b.id).await.unwrap().len(), 1);
        assert_eq!(store.list_products(b.id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rows_are_invisible_to_other_owners() {
        let store = MemoryStore::new();
        let a = store.insert_user(&user("a@x.com")).await.unwrap();
        let b = store.insert_user(&user("b@x.com")).await.unwrap();
        let cat = store.insert_category(&category(a.id, "A", None)).await.unwrap();

        assert!(store.find_category(b.id, cat.id).await.unwrap().is_none());
        assert!(!store.delete_category(b.id, cat.id).await.unwrap());

        let mut hijack = cat.clone();
        hijack.user_id = b.id;
        hijack.name = "stolen".into();
        assert!(store.update_category(&hijack).await.unwrap().is_none());
        assert_eq!(store.find_category(a.id, cat.id).await.unwrap().unwrap().name, "A");
    }

    #[tokio::test]
    async fn product_requires_existing_category() {
        let store = MemoryStore::new();
        let a = store.insert_user(&user("a@x.com")).await.unwrap();
        let err = store
            .insert_product(&product(a.id, "Orphan", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference { field: "category", .. }));
    }

    #[tokio::test]
    async fn listing_is_name_descending() {
        let store = MemoryStore::new();
        let a = store.insert_user(&user("a@x.com")).await.unwrap();
        for name in ["Beta", "Alpha", "Gamma"] {
            store.insert_category(&category(a.id, name, None)).await.unwrap();
        }
        let names: Vec<String> = store
            .list_categories(a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Alpha"]);
    }

    #[tokio::test]
    async fn update_refuses_parent_cycle() {
        let store = MemoryStore::new();
        let owner = store.insert_user(&user("a@x.com")).await.unwrap();
        let a = store.insert_category(&category(owner.id, "A", None)).await.unwrap();
        let b = store.insert_category(&category(owner.id, "B", None)).await.unwrap();

        let mut a_under_b = a.clone();
        a_under_b.parent_category_id = Some(b.id);
        assert!(store.update_category(&a_under_b).await.unwrap().is_some());

        // B -> A passed a stale read elsewhere; the store still refuses it
        let mut b_under_a = b.clone();
        b_under_a.parent_category_id = Some(a.id);
        assert!(matches!(
            store.update_category(&b_under_a).await,
            Err(StoreError::InvalidReference { field: "parent_category", .. })
        ));

        let mut own_parent = a.clone();
        own_parent.parent_category_id = Some(a.id);
        assert!(store.update_category(&own_parent).await.is_err());
        assert_eq!(store.find_category(owner.id, b.id).await.unwrap().unwrap().parent_category_id, None);
    }
}
