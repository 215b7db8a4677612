use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::format::{ProfilePayload, SignupPayload, TokenPayload};
use crate::api::validate::{normalize_email, Validator, NAME_MAX_LENGTH};
use crate::auth::{self, hash_password, verify_password};
use crate::config::SecurityConfig;
use crate::database::{CatalogStore, StoreError, User};
use crate::error::{ApiError, FieldErrors};
use crate::middleware::auth::Identity;

const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Account lifecycle, credential checks and token issuance
pub struct UserService<'a> {
    store: &'a dyn CatalogStore,
    security: &'a SecurityConfig,
}

impl<'a> UserService<'a> {
    pub fn new(store: &'a dyn CatalogStore, security: &'a SecurityConfig) -> Self {
        Self { store, security }
    }

    /// Sign up a regular account
    pub async fn create_user(&self, payload: SignupPayload) -> Result<User, ApiError> {
        self.create(payload, false).await
    }

    /// Create an account with staff and superuser flags set
    pub async fn create_superuser(&self, payload: SignupPayload) -> Result<User, ApiError> {
        self.create(payload, true).await
    }

    async fn create(&self, payload: SignupPayload, privileged: bool) -> Result<User, ApiError> {
        let mut v = Validator::new();
        let email = v.email("email", payload.email.as_ref());
        let password = v.password("password", payload.password.as_ref(), self.security.min_password_length);
        let name = v.optional_text("name", payload.name.as_ref(), NAME_MAX_LENGTH);
        v.finish()?;

        // finish() guarantees every field parsed
        let (Some(email), Some(password), Some(name)) = (email, password, name) else {
            return Err(ApiError::internal_server_error("Validation state inconsistent"));
        };

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(StoreError::duplicate_email().into());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password: hash_password(&password)?,
            name,
            is_active: true,
            is_staff: privileged,
            is_superuser: privileged,
            created_at: now,
            updated_at: now,
        };

        let user = self.store.insert_user(&user).await?;
        info!("Created user {} (superuser: {})", user.id, privileged);
        Ok(user)
    }

    /// Exchange email + password for a bearer token
    pub async fn issue_token(&self, payload: TokenPayload) -> Result<String, ApiError> {
        let mut v = Validator::new();
        let email = v.required_text("email", payload.email.as_ref(), usize::MAX);
        let password = v.password("password", payload.password.as_ref(), 0);
        v.finish()?;

        let (Some(email), Some(password)) = (email, password) else {
            return Err(ApiError::internal_server_error("Validation state inconsistent"));
        };

        let email = normalize_email(&email);
        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!("Token request rejected: unknown or inactive account");
                return Err(invalid_credentials());
            }
        };

        if !verify_password(&password, &user.password)? {
            warn!("Token request rejected: bad password for user {}", user.id);
            return Err(invalid_credentials());
        }

        let token = auth::issue_token(user.id, self.security)?;
        info!("Issued token for user {}", user.id);
        Ok(token)
    }

    /// Resolve a bearer token into the identity of an active user
    pub async fn authenticate(&self, token: &str) -> Result<Identity, ApiError> {
        let claims = auth::verify_token(token, self.security).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            ApiError::unauthorized("Invalid token.")
        })?;

        match self.store.find_user(claims.sub).await? {
            Some(user) if user.is_active => Ok(Identity::from(&user)),
            _ => {
                warn!("Rejected bearer token for missing or inactive user {}", claims.sub);
                Err(ApiError::unauthorized("User inactive or deleted."))
            }
        }
    }

    pub async fn get_profile(&self, identity: &Identity) -> Result<User, ApiError> {
        self.store
            .find_user(identity.user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User inactive or deleted."))
    }

    /// Update the caller's own account. With `partial` only supplied fields
    /// change; otherwise email and password are required.
    pub async fn update_profile(
        &self,
        identity: &Identity,
        payload: ProfilePayload,
        partial: bool,
    ) -> Result<User, ApiError> {
        let mut user = self.get_profile(identity).await?;
        let min_len = self.security.min_password_length;

        let mut v = Validator::new();
        let email = if partial && payload.email.is_none() {
            None
        } else {
            v.email("email", payload.email.as_ref())
        };
        let password = if partial && payload.password.is_none() {
            None
        } else {
            v.password("password", payload.password.as_ref(), min_len)
        };
        let name = payload
            .name
            .as_ref()
            .and_then(|n| v.optional_text("name", Some(n), NAME_MAX_LENGTH));
        v.finish()?;

        if let Some(email) = email {
            if email != user.email {
                if let Some(other) = self.store.find_user_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(StoreError::duplicate_email().into());
                    }
                }
                user.email = email;
            }
        }
        if let Some(password) = password {
            user.password = hash_password(&password)?;
        }
        if let Some(name) = name {
            user.name = name;
        }
        user.updated_at = Utc::now();

        let user = self.store.update_user(&user).await?;
        info!("Updated profile for user {}", user.id);
        Ok(user)
    }

    /// Hard delete by email; categories and products go with the account
    pub async fn delete_user(&self, email: &str) -> Result<User, ApiError> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No user with email {}", email)))?;
        self.store.delete_user(user.id).await?;
        info!("Deleted user {} with all owned categories and products", user.id);
        Ok(user)
    }
}

fn invalid_credentials() -> ApiError {
    let mut field_errors = FieldErrors::new();
    field_errors.insert("non_field_errors".to_string(), INVALID_CREDENTIALS.to_string());
    ApiError::validation_error(INVALID_CREDENTIALS, Some(field_errors))
}
