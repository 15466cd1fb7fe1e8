//! E2E Class Management Tests

use super::common::TestEnv;
use serde_json::{json, Value};

#[tokio::test]
async fn test_professor_creates_student_joins() {
    let env = TestEnv::start().await;
    let professor = env.signup("prof@example.edu", "professor").await;
    let student = env.signup("student@example.edu", "student").await;

    let class_id = env.create_class(&professor, "SPA101").await;

    let response = env
        .post(
            "/api/class/join-class",
            Some(&student),
            json!({"classCode": "SPA101"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Successfully joined the class.");

    let joined: Value = env
        .get("/api/class/get-classes", Some(&student))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(joined[0]["classId"], class_id.as_str());
    assert_eq!(joined[0]["professorName"], "E2E User");

    let taught: Value = env
        .get("/api/class/fetch", Some(&professor))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(taught.as_array().unwrap().len(), 1);

    // Students see nothing under their own name
    let taught: Value = env
        .get("/api/class/fetch", Some(&student))
        .await
        .json()
        .await
        .unwrap();
    assert!(taught.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_class_info_is_public() {
    let env = TestEnv::start().await;
    let professor = env.signup("prof@example.edu", "professor").await;
    let class_id = env.create_class(&professor, "SPA102").await;

    let response = env
        .get(&format!("/api/class/get-class-info/{}", class_id), None)
        .await;
    assert_eq!(response.status(), 200);

    let class: Value = response.json().await.unwrap();
    assert_eq!(class["title"], "Spanish I");
    assert_eq!(class["code"], "SPA102");
}
