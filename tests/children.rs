mod support;

use asksniff::application::repos::ChildrenRepo;
use axum::http::StatusCode;
use serde_json::json;
use support::{TestApp, seed_content};

#[tokio::test]
async fn active_child_decides_the_content_age_group() {
    let mut app = TestApp::new();
    let seeded = seed_content(&app.backend).await;
    app.sign_up("robin").await;
    app.add_child("Sam", "2023-09-01").await;

    let homepage = app.get("/homepage/").await;
    assert_eq!(homepage.status, StatusCode::OK);
    assert!(homepage.body.contains("<strong>Sam</strong>, 3 years and 1 months"));

    let page = app
        .get(&format!("/symptom/information/{}", seeded.heading.id))
        .await;
    assert!(page.body.contains("Toddler fever"));
    assert!(!page.body.contains("Newborn fever"));
}

#[tokio::test]
async fn children_outside_the_age_window_are_rejected() {
    let mut app = TestApp::new();
    app.sign_up("robin").await;

    let too_old = app
        .post_form("/child/", &[("childName", "Alex"), ("dob", "2020-01-01")])
        .await;
    assert_eq!(too_old.status, StatusCode::OK);
    assert!(too_old.body.contains("No child above the age of 5 can be added"));

    let unborn = app
        .post_form("/child/", &[("childName", "Alex"), ("dob", "2026-12-01")])
        .await;
    assert!(unborn.body.contains("No child above the age of 5 can be added"));

    let garbled = app
        .post_form("/child/", &[("childName", "Alex"), ("dob", "yesterday")])
        .await;
    assert!(garbled.body.contains("No child above the age of 5 can be added"));
}

#[tokio::test]
async fn newest_child_is_active_until_another_is_chosen() {
    let mut app = TestApp::new();
    app.sign_up("robin").await;
    let sam = app.add_child("Sam", "2023-09-01").await;
    let kit = app.add_child("Kit", "2026-09-20").await;

    let listing = app.get("/child/").await;
    assert!(listing.body.contains("Sam"));
    assert!(listing.body.contains("Kit"));
    assert!(app.get("/homepage/").await.body.contains("<strong>Kit</strong>"));

    let activated = app
        .post_form("/childActivate/", &[("id", &sam.to_string())])
        .await;
    assert_eq!(activated.json(), json!({"status": 1}));
    assert!(app.get("/homepage/").await.body.contains("<strong>Sam</strong>"));

    let deleted = app
        .post_form("/childDelete/", &[("id", &sam.to_string())])
        .await;
    assert_eq!(deleted.json(), json!({"status": 1}));

    let remaining = app
        .backend
        .list_children(app.user_id("robin").await)
        .await
        .expect("children lookup");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kit);
    assert!(remaining[0].active);
}

#[tokio::test]
async fn children_of_other_accounts_cannot_be_touched() {
    let mut owner = TestApp::new();
    owner.sign_up("robin").await;
    let sam = owner.add_child("Sam", "2023-09-01").await;

    let mut other = owner.stranger();
    other.sign_up("jules").await;

    let id = sam.to_string();
    assert_eq!(
        other.post_form("/childActivate/", &[("id", &id)]).await.json(),
        json!({"status": 0})
    );
    assert_eq!(
        other.post_form("/childDelete/", &[("id", &id)]).await.json(),
        json!({"status": 0})
    );

    let edit = other
        .post_form(
            "/child/manage/",
            &[("childID", &id), ("childName", "Taken"), ("dob", "2023-09-01")],
        )
        .await;
    assert_eq!(edit.status, StatusCode::OK);
    assert!(edit.body.contains("No child above the age of 5 can be added"));

    let child = owner
        .backend
        .find_child(owner.user_id("robin").await, sam)
        .await
        .expect("child lookup")
        .expect("child still exists");
    assert_eq!(child.name, "Sam");
}

#[tokio::test]
async fn children_can_be_renamed() {
    let mut app = TestApp::new();
    app.sign_up("robin").await;
    let sam = app.add_child("Sam", "2023-09-01").await;

    let page = app.get("/child/manage/").await;
    assert_eq!(page.status, StatusCode::OK);

    app.post_form(
        "/child/manage/",
        &[
            ("childID", &sam.to_string()),
            ("childName", "Samuel"),
            ("dob", "2023-08-01"),
        ],
    )
    .await
    .assert_redirect("/child/manage/");
    assert!(app.get("/homepage/").await.body.contains("<strong>Samuel</strong>"));
}

#[tokio::test]
async fn child_endpoints_require_sign_in() {
    let mut app = TestApp::new();
    app.get("/child/").await.assert_redirect("/?next=%2Fchild%2F");
    app.post_form("/childActivate/", &[("id", "1")])
        .await
        .assert_redirect("/?next=%2FchildActivate%2F");
}
