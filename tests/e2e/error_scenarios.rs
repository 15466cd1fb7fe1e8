//! E2E Error Handling Tests

use super::common::{TestEnv, TEST_BUCKET};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_unknown_route_is_404() {
    let env = TestEnv::start().await;
    let response = env.get("/api/unknown", None).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let env = TestEnv::start().await;
    let response = env.get("/api/auth/signup", None).await;
    assert_eq!(response.status(), 405);
}

#[tokio::test]
async fn test_protected_routes_need_a_session() {
    let env = TestEnv::start().await;

    for path in [
        "/api/class/fetch",
        "/api/class/get-classes",
        "/api/documents/classes/c1",
    ] {
        let response = env.get(path, None).await;
        assert_eq!(response.status(), 401, "{}", path);
        assert_eq!(response.headers()["www-authenticate"], "Bearer");
    }

    let response = env
        .post(
            "/api/documents/upload-document",
            None,
            json!({"files": [{"fileName": "a", "contentType": "application/pdf"}]}),
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_student_cannot_create_class() {
    let env = TestEnv::start().await;
    let token = env.signup("student@example.edu", "student").await;

    let response = env
        .post(
            "/api/class/create",
            Some(&token),
            json!({"title": "t", "description": "d", "subject": "s", "code": "X1"}),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let env = TestEnv::start().await;
    env.signup("ada@example.edu", "professor").await;

    let response = env
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Ada",
                "email": "ada@example.edu",
                "password": "another",
                "role": "professor"
            }),
        )
        .await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn test_ai_upstream_failure_relayed_as_500() {
    let env = TestEnv::start().await;
    let token = env.signup("student@example.edu", "student").await;

    Mock::given(method("POST"))
        .and(path("/ai/translate"))
        .respond_with(
            ResponseTemplate::new(502).set_body_json(json!({"message": "Model overloaded"})),
        )
        .mount(&env.upstream)
        .await;

    let response = env
        .post(
            "/api/ai-documents/translate",
            Some(&token),
            json!({"text": "hello", "target_language": "es"}),
        )
        .await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Model overloaded");
}

#[tokio::test]
async fn test_text_extraction_forwards_bucket_and_key() {
    let env = TestEnv::start().await;
    let token = env.signup("student@example.edu", "student").await;

    Mock::given(method("POST"))
        .and(path("/ai/extract"))
        .and(wiremock::matchers::body_json(json!({
            "bucket_name": "edulang-docs",
            "file_key": "c1/notes-1.pdf"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"extracted_text": "Hola"})))
        .expect(1)
        .mount(&env.upstream)
        .await;

    let response = env
        .post(
            "/api/ai-documents/text-extraction",
            Some(&token),
            json!({"s3FileUrl": "https://edulang-docs.s3.us-east-1.amazonaws.com/c1%2Fnotes-1.pdf"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["extracted_text"], "Hola");
}

#[tokio::test]
async fn test_text_extraction_resolves_issued_file_url() {
    let env = TestEnv::start().await;
    let token = env.signup("prof@example.edu", "professor").await;

    let targets: Value = env
        .post(
            "/api/documents/upload-document",
            Some(&token),
            json!({
                "classId": "c1",
                "files": [{"fileName": "notes", "contentType": "application/pdf"}]
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let file_url = targets["data"][0]["fileUrl"].as_str().unwrap().to_string();

    Mock::given(method("POST"))
        .and(path("/ai/extract"))
        .and(wiremock::matchers::body_partial_json(
            json!({"bucket_name": TEST_BUCKET}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"extracted_text": "Hola"})))
        .expect(1)
        .mount(&env.upstream)
        .await;

    let response = env
        .post(
            "/api/ai-documents/text-extraction",
            Some(&token),
            json!({ "s3FileUrl": file_url }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let requests = env.upstream.received_requests().await.unwrap();
    let forwarded: Value = requests
        .iter()
        .find(|r| r.url.path() == "/ai/extract")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    let key = forwarded["file_key"].as_str().unwrap();
    assert!(key.starts_with("c1/notes-"), "{}", key);
    assert!(key.ends_with(".pdf"), "{}", key);
}
