use anyhow::anyhow;
use serde_json::json;

use crate::api::format::SignupPayload;
use crate::cli::{utils, OutputFormat};
use crate::config;
use crate::services::UserService;

pub async fn create_superuser(
    email: String,
    password: String,
    name: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let config = config::config();
    let store = utils::connect_store(config).await?;
    let users = UserService::new(&store, &config.security);

    let payload = SignupPayload {
        email: Some(email.into()),
        password: Some(password.into()),
        name: name.map(Into::into),
    };
    let user = users
        .create_superuser(payload)
        .await
        .map_err(|e| anyhow!(describe(&e)))?;

    utils::output_success(
        output_format,
        &format!("Created superuser {}", user.email),
        Some(json!({ "id": user.id, "email": user.email })),
    )
}

pub async fn delete_user(email: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    let store = utils::connect_store(config).await?;
    let users = UserService::new(&store, &config.security);

    let user = users
        .delete_user(&email)
        .await
        .map_err(|e| anyhow!(describe(&e)))?;

    utils::output_success(
        output_format,
        &format!("Deleted user {} and everything it owned", user.email),
        Some(json!({ "id": user.id })),
    )
}

/// Flatten field errors into one line for the terminal
fn describe(err: &crate::error::ApiError) -> String {
    match err.field_errors() {
        Some(fields) if !fields.is_empty() => {
            let mut parts: Vec<String> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            parts.sort();
            parts.join("; ")
        }
        _ => err.message().to_string(),
    }
}
