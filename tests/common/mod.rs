#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use catalog_api::config::AppConfig;
use catalog_api::database::MemoryStore;
use catalog_api::{app, AppState};

pub const PASSWORD: &str = "1234567aA";

/// Router over a fresh in-memory store, driven without a socket
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::new(Arc::new(MemoryStore::new()), AppConfig::development());
        Self { router: app(state) }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<(StatusCode, Value)> {
        let body = json!({ "email": email, "password": password, "name": name });
        self.request(Method::POST, "/user/create", None, Some(body)).await
    }

    pub async fn token(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        let body = json!({ "email": email, "password": password });
        self.request(Method::POST, "/user/token", None, Some(body)).await
    }

    /// Sign up and log in; returns the bearer token
    pub async fn login(&self, email: &str) -> Result<String> {
        let (status, _) = self.signup(email, PASSWORD, "test").await?;
        anyhow::ensure!(status == StatusCode::CREATED, "signup failed: {}", status);
        let (status, body) = self.token(email, PASSWORD).await?;
        anyhow::ensure!(status == StatusCode::OK, "token failed: {}", status);
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("token missing from response")
    }

    pub async fn create_category(&self, token: &str, name: &str, parent: Option<&str>) -> Result<String> {
        let body = json!({ "name": name, "persian_title": name, "parent_category": parent });
        let (status, body) = self.post("/category/categories", token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "category create failed: {} {}", status, body);
        id_of(&body)
    }

    pub async fn create_product(&self, token: &str, name: &str, category: &str) -> Result<String> {
        let body = json!({ "name": name, "category": category });
        let (status, body) = self.post("/category/products", token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "product create failed: {} {}", status, body);
        id_of(&body)
    }
}

pub fn id_of(body: &Value) -> Result<String> {
    body["data"]["id"]
        .as_str()
        .map(str::to_string)
        .context("id missing from response")
}

pub fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// The built `catalog-api` binary on an unused port, in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_catalog-api"))
            .arg("--memory")
            .env("API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env_remove("DATABASE_URL")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
