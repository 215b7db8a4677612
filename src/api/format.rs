use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{Category, Product, User};

// ---------------------------------------------------------------------------
// Outgoing representations. Each lists exactly the fields clients may see;
// `id` is never read from input.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRepresentation {
    pub id: Uuid,
    pub name: String,
    pub persian_title: String,
    pub parent_category: Option<Uuid>,
}

impl From<&Category> for CategoryRepresentation {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            persian_title: category.persian_title.clone(),
            parent_category: category.parent_category_id,
        }
    }
}

/// Category with its products nested, served for `?expand=products`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetailRepresentation {
    #[serde(flatten)]
    pub category: CategoryRepresentation,
    pub products: Vec<ProductRepresentation>,
}

impl CategoryDetailRepresentation {
    pub fn new(category: &Category, products: &[Product]) -> Self {
        Self {
            category: category.into(),
            products: products.iter().map(ProductRepresentation::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryView {
    Detail(CategoryDetailRepresentation),
    Plain(CategoryRepresentation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRepresentation {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Uuid,
}

impl From<&Product> for ProductRepresentation {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category_id,
        }
    }
}

/// Returned by signup; never includes the password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRepresentation {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserRepresentation {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Returned by `/user/me`. `password` is the stored hash, never plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRepresentation {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl From<&User> for ProfileRepresentation {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRepresentation {
    pub token: String,
}

// ---------------------------------------------------------------------------
// Incoming payloads. Fields stay raw JSON at the serde level so that missing
// or mistyped values surface as field-level validation errors, and unknown
// fields (`id`, `user`, ...) are ignored.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupPayload {
    pub email: Option<Value>,
    pub password: Option<Value>,
    pub name: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenPayload {
    pub email: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePayload {
    pub email: Option<Value>,
    pub password: Option<Value>,
    pub name: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPayload {
    pub name: Option<Value>,
    pub persian_title: Option<Value>,
    /// Absent: leave unchanged. `null`: detach from parent.
    #[serde(default, deserialize_with = "double_option")]
    pub parent_category: Option<Option<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPayload {
    pub name: Option<Value>,
    pub description: Option<Value>,
    pub category: Option<Value>,
}

/// Query string accepted by category retrieval
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryQuery {
    pub expand: Option<String>,
}

impl CategoryQuery {
    pub fn expand_products(&self) -> bool {
        self.expand
            .as_deref()
            .is_some_and(|e| e.split(',').any(|part| part.trim() == "products"))
    }
}

/// Query string accepted by product listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<Uuid>,
}

/// Distinguish an absent field from an explicit `null`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
