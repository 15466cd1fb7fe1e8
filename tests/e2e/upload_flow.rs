//! E2E Upload Flow Tests
//!
//! The pipeline asks the running server for presigned targets, PUTs the bytes
//! to the mock storage endpoint, then saves the metadata back through the
//! server.

use super::common::{TestEnv, TEST_BUCKET};
use edulang_api::upload::http::{ApiClient, ApiMetadataSink, ApiTargetIssuer, PresignedPut};
use edulang_api::upload::{FailureStage, UploadError, UploadFile, UploadPipeline};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Mock, ResponseTemplate};

fn pipeline(
    env: &TestEnv,
    token: &str,
) -> UploadPipeline<ApiTargetIssuer, PresignedPut, ApiMetadataSink> {
    let api = ApiClient::new(env.client.clone(), &env.base_url, token);
    UploadPipeline::new(
        ApiTargetIssuer::new(api.clone()),
        PresignedPut::new(env.client.clone()),
        ApiMetadataSink::new(api),
    )
}

fn files() -> Vec<UploadFile> {
    vec![
        UploadFile::new("syllabus.pdf", "application/pdf", "%PDF-1.7"),
        UploadFile::new("notes.txt", "text/plain", "week one"),
        UploadFile::new("slide.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]),
    ]
}

async fn documents(env: &TestEnv, token: &str, class_id: &str) -> Vec<Value> {
    env.get(&format!("/api/documents/classes/{}", class_id), Some(token))
        .await
        .json::<Value>()
        .await
        .unwrap()
        .as_array()
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_presigned_targets_point_at_storage() {
    let env = TestEnv::start().await;
    let token = env.signup("prof@example.edu", "professor").await;

    let response = env
        .post(
            "/api/documents/upload-document",
            Some(&token),
            json!({
                "classId": "c1",
                "files": [{"fileName": "syllabus", "contentType": "application/pdf"}]
            }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Upload URLs generated");

    let upload_url = body["data"][0]["uploadUrl"].as_str().unwrap();
    let file_url = body["data"][0]["fileUrl"].as_str().unwrap();
    let prefix = format!("{}/{}/c1/syllabus-", env.upstream.uri(), TEST_BUCKET);
    assert!(upload_url.starts_with(&prefix), "{}", upload_url);
    assert!(upload_url.contains("X-Amz-Signature="));
    assert!(upload_url.contains("X-Amz-Expires=900"));
    assert!(file_url.starts_with(&format!(
        "{}/{}/c1%2Fsyllabus-",
        env.upstream.uri(),
        TEST_BUCKET
    )));
    assert!(file_url.ends_with(".pdf"));
}

#[tokio::test]
async fn test_all_files_uploaded_and_recorded() {
    let env = TestEnv::start().await;
    let token = env.signup("prof@example.edu", "professor").await;
    let class_id = env.create_class(&token, "UP1").await;

    Mock::given(method("PUT"))
        .and(path_regex(format!("^/{}/{}/.+", TEST_BUCKET, class_id)))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&env.upstream)
        .await;

    let records = pipeline(&env, &token)
        .submit(&class_id, files())
        .await
        .expect("upload should succeed");

    let names: Vec<_> = records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["syllabus.pdf", "notes.txt", "slide.png"]);

    let stored = documents(&env, &token, &class_id).await;
    assert_eq!(stored.len(), 3);
    assert!(stored
        .iter()
        .all(|d| d["fileUrl"].as_str().unwrap().contains("%2F")));
}

#[tokio::test]
async fn test_put_carries_content_type() {
    let env = TestEnv::start().await;
    let token = env.signup("prof@example.edu", "professor").await;
    let class_id = env.create_class(&token, "UP2").await;

    Mock::given(method("PUT"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&env.upstream)
        .await;

    pipeline(&env, &token)
        .submit(
            &class_id,
            vec![UploadFile::new("syllabus.pdf", "application/pdf", "%PDF-1.7")],
        )
        .await
        .expect("upload should succeed");
}

#[tokio::test]
async fn test_one_failed_transfer_fails_submission_without_stopping_others() {
    let env = TestEnv::start().await;
    let token = env.signup("prof@example.edu", "professor").await;
    let class_id = env.create_class(&token, "UP3").await;

    Mock::given(method("PUT"))
        .and(path_regex(r"/notes\.txt-"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Request has expired"))
        .with_priority(1)
        .expect(1)
        .mount(&env.upstream)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(2)
        .expect(2)
        .mount(&env.upstream)
        .await;

    let err = pipeline(&env, &token)
        .submit(&class_id, files())
        .await
        .unwrap_err();

    match err {
        UploadError::Failed { total, failures } => {
            assert_eq!(total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].file_name, "notes.txt");
            assert_eq!(failures[0].stage, FailureStage::Transfer);
        }
        other => panic!("expected Failed, got {:?}", other),
    }

    // The other files still went through both steps
    let stored = documents(&env, &token, &class_id).await;
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_invalid_file_fails_before_any_transfer() {
    let env = TestEnv::start().await;
    let token = env.signup("prof@example.edu", "professor").await;
    let class_id = env.create_class(&token, "UP4").await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.upstream)
        .await;

    let err = pipeline(&env, &token)
        .submit(
            &class_id,
            vec![
                UploadFile::new("a.pdf", "application/pdf", "a"),
                UploadFile::new("b.bin", "", "b"),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Targets(_)));
    assert!(documents(&env, &token, &class_id).await.is_empty());
}

#[tokio::test]
async fn test_blank_class_stores_nothing() {
    let env = TestEnv::start().await;
    let token = env.signup("prof@example.edu", "professor").await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.upstream)
        .await;

    let err = pipeline(&env, &token).submit("", files()).await.unwrap_err();
    assert!(matches!(err, UploadError::MissingClass));
}
