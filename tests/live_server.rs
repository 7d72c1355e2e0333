use reqwest::Client;
use serde_json::{json, Value};

// Runs against a server started separately, e.g.
//   ISSUES_STORE__BACKEND=memory cargo run
//   TEST_API_BASE_URL=http://127.0.0.1:3000 cargo test --test live_server -- --ignored
#[tokio::test]
#[ignore]
async fn test_issue_lifecycle_against_running_server() {
    let base_url =
        std::env::var("TEST_API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let client = Client::new();
    let path = format!("{}/api/issues/livetest", base_url);

    let created: Value = client
        .post(&path)
        .json(&json!({"issue_title": "live", "issue_text": "created over http"}))
        .send()
        .await
        .expect("Failed to create issue")
        .json()
        .await
        .unwrap();
    let id = created["_id"].as_str().expect("issue has an _id").to_string();

    let listed: Value = client
        .get(&path)
        .query(&[("_id", id.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let updated: Value = client
        .put(&path)
        .json(&json!({"_id": id, "open": "false"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["result"], "successfully updated");

    let deleted: Value = client
        .delete(&path)
        .json(&json!({"_id": id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["result"], "successfully deleted");
}
