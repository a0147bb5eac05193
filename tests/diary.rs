mod support;

use asksniff::application::repos::DiaryRepo;
use axum::http::StatusCode;
use serde_json::json;
use support::TestApp;

#[tokio::test]
async fn entries_can_be_written_edited_and_deleted() {
    let mut app = TestApp::new();
    app.sign_up("robin").await;
    let sam = app.add_child("Sam", "2023-09-01").await;
    let diary_path = format!("/diary/{sam}");

    let index = app.get("/diary/").await;
    assert!(index.body.contains(&diary_path));

    app.post_form(
        &diary_path,
        &[
            ("check_id", "0"),
            ("title", "First steps"),
            ("text", "Walked across the room."),
            ("image", ""),
        ],
    )
    .await
    .assert_redirect(&diary_path);

    let logs = app.backend.list_logs(sam).await.expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].image, None);
    let log_id = logs[0].id.to_string();

    let page = app.get(&diary_path).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("First steps"));

    app.post_form(
        &diary_path,
        &[
            ("check_id", &log_id),
            ("title", "First real steps"),
            ("text", "Walked to the sofa."),
        ],
    )
    .await
    .assert_redirect(&diary_path);
    assert!(app.get(&diary_path).await.body.contains("First real steps"));

    let deleted = app.post_form("/diary/delete/", &[("id", &log_id)]).await;
    assert_eq!(deleted.json(), json!({"status": 1}));
    assert!(app.backend.list_logs(sam).await.expect("logs").is_empty());
}

#[tokio::test]
async fn invalid_entries_are_rejected_inline() {
    let mut app = TestApp::new();
    app.sign_up("robin").await;
    let sam = app.add_child("Sam", "2023-09-01").await;
    let diary_path = format!("/diary/{sam}");
    let long_title = "t".repeat(151);

    let response = app
        .post_form(
            &diary_path,
            &[("check_id", "0"), ("title", &long_title), ("text", "")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Diary entry not added"));

    let unknown_entry = app
        .post_form(
            &diary_path,
            &[("check_id", "4242"), ("title", "Edit"), ("text", "")],
        )
        .await;
    assert!(unknown_entry.body.contains("Diary entry not added"));
}

#[tokio::test]
async fn other_accounts_cannot_read_or_delete_a_diary() {
    let mut owner = TestApp::new();
    owner.sign_up("robin").await;
    let sam = owner.add_child("Sam", "2023-09-01").await;
    let diary_path = format!("/diary/{sam}");
    owner
        .post_form(&diary_path, &[("check_id", "0"), ("title", "Private")])
        .await
        .assert_redirect(&diary_path);
    let log_id = owner.backend.list_logs(sam).await.expect("logs")[0]
        .id
        .to_string();

    let mut other = owner.stranger();
    other.sign_up("jules").await;
    other.get(&diary_path).await.assert_redirect("/");
    assert_eq!(
        other
            .post_form("/diary/delete/", &[("id", &log_id)])
            .await
            .json(),
        json!({"status": 0})
    );
    assert_eq!(owner.backend.list_logs(sam).await.expect("logs").len(), 1);
}
