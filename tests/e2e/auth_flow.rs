//! E2E Authentication Flow Tests

use super::common::TestEnv;
use serde_json::{json, Value};

#[tokio::test]
async fn test_signup_login_and_session_lookup() {
    let env = TestEnv::start().await;
    env.signup("ada@example.edu", "professor").await;

    let response = env
        .post(
            "/api/auth/login",
            None,
            json!({"email": "ada@example.edu", "password": "correct horse"}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("login sets the session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=86400"));

    // Present the token the way a browser would
    let session_cookie = cookie.split(';').next().unwrap().to_string();
    let response = env
        .client
        .get(env.url("/api/auth/user"))
        .header("Cookie", session_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "User session retrieved");
    assert_eq!(body["session"]["email"], "ada@example.edu");
    assert_eq!(body["session"]["role"], "professor");
    assert_eq!(body["session"]["tokensAvailable"], 1000);
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let env = TestEnv::start().await;
    let token = env.signup("grace@example.edu", "student").await;

    let response = env.get("/api/auth/user", Some(&token)).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let env = TestEnv::start().await;
    let token = env.signup("grace@example.edu", "student").await;
    let tampered = format!("{}x", token);

    let response = env.get("/api/auth/user", Some(&tampered)).await;
    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let env = TestEnv::start().await;
    let token = env.signup("ada@example.edu", "professor").await;

    let response = env
        .client
        .post(env.url("/api/auth/logout"))
        .header("Cookie", format!("auth-token={}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let cookie = response.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("auth-token=;"));
    assert!(cookie.contains("Max-Age=0"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Logged out successfully");
}
