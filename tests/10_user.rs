mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn signup_token_profile_flow() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.signup("a@x.com", PASSWORD, "t").await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "a@x.com");
    assert_eq!(body["data"]["name"], "t");
    assert!(body["data"].get("password").is_none());

    let (status, body) = app.token("a@x.com", PASSWORD).await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/user/me", &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "t");
    assert_eq!(body["data"]["email"], "a@x.com");
    let hash = body["data"]["password"].as_str().unwrap();
    assert!(!hash.is_empty());
    assert_ne!(hash, PASSWORD);
    Ok(())
}

#[tokio::test]
async fn email_is_stored_lowercase_and_unique() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.signup("Amin_Mohammadi05@YAHOO.com", PASSWORD, "").await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "amin_mohammadi05@yahoo.com");

    let (status, body) = app.signup("amin_mohammadi05@yahoo.COM", PASSWORD, "").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "CONFLICT");

    // login is case-insensitive too
    let (status, _) = app.token("AMIN_MOHAMMADI05@yahoo.com", PASSWORD).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn short_password_is_rejected_and_nothing_persisted() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.signup("a@x.com", "pw", "t").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["password"].is_string());

    let (status, _) = app.token("a@x.com", "pw").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the address is still free
    let (status, _) = app.signup("a@x.com", PASSWORD, "t").await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn signup_requires_email_and_password() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .request(Method::POST, "/user/create", None, Some(json!({ "name": "t" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["password"].is_string());

    let (status, body) = app.signup("not-an-email", PASSWORD, "t").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["email"].is_string());
    Ok(())
}

#[tokio::test]
async fn token_rejects_bad_credentials_without_token() -> Result<()> {
    let app = TestApp::new();
    app.signup("a@x.com", PASSWORD, "t").await?;

    for (email, password) in [("nobody@x.com", PASSWORD), ("a@x.com", "wrong-password")] {
        let (status, body) = app.token(email, password).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["field_errors"]["non_field_errors"].is_string());
        assert!(body.get("data").is_none());
    }

    let (status, body) = app
        .request(Method::POST, "/user/token", None, Some(json!({ "email": "a@x.com" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn profile_requires_valid_token() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/user/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);

    let (status, _) = app.get("/user/me", "garbage").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/category/categories", "garbage").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_scheme_is_accepted() -> Result<()> {
    let app = TestApp::new();
    let token = app.login("a@x.com").await?;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/user/me")
        .header(header::AUTHORIZATION, format!("Token {}", token))
        .body(Body::empty())?;
    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "a@x.com");
    Ok(())
}

#[tokio::test]
async fn post_to_profile_is_method_not_allowed() -> Result<()> {
    let app = TestApp::new();
    let token = app.login("a@x.com").await?;

    let (status, body) = app.post("/user/me", &token, json!({ "name": "x" })).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    Ok(())
}

#[tokio::test]
async fn patch_updates_name_and_password() -> Result<()> {
    let app = TestApp::new();
    let token = app.login("a@x.com").await?;

    let (status, body) = app
        .request(Method::PATCH, "/user/me", Some(&token), Some(json!({ "name": "Renamed" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["email"], "a@x.com");

    let (status, _) = app
        .request(Method::PATCH, "/user/me", Some(&token), Some(json!({ "password": "newpass1" })))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.token("a@x.com", PASSWORD).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.token("a@x.com", "newpass1").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn put_requires_email_and_password() -> Result<()> {
    let app = TestApp::new();
    let token = app.login("a@x.com").await?;

    let (status, body) = app
        .request(Method::PUT, "/user/me", Some(&token), Some(json!({ "name": "x" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn profile_email_cannot_take_another_account() -> Result<()> {
    let app = TestApp::new();
    app.login("b@x.com").await?;
    let token = app.login("a@x.com").await?;

    let (status, body) = app
        .request(Method::PATCH, "/user/me", Some(&token), Some(json!({ "email": "B@x.com" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_bad_request() -> Result<()> {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/user/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;
    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    Ok(())
}

#[tokio::test]
async fn unsupported_verbs_get_json_errors() -> Result<()> {
    let app = TestApp::new();
    let token = app.login("a@x.com").await?;

    let (status, body) = app.delete("/user/me", &token).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");

    let (status, body) = app.request(Method::GET, "/user/create", None, None).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");

    let (status, body) = app.get("/no/such/route", &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn whitespace_password_is_blank() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.signup("a@x.com", "       ", "t").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["password"].is_string());

    let (status, _) = app.token("a@x.com", "       ").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn mistyped_signup_fields_are_field_errors() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/user/create",
            None,
            Some(json!({ "email": 42, "password": ["x"], "name": "t" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["password"].is_string());
    Ok(())
}
