mod support;

use asksniff::{
    application::repos::ContentRepo,
    domain::types::AgeGroup,
};
use axum::http::StatusCode;
use serde_json::json;
use support::{TestApp, seed_content};

#[tokio::test]
async fn console_is_for_editors_only() {
    let mut anonymous = TestApp::new();
    anonymous.get("/admin/").await.assert_redirect("/?next=%2Fadmin%2F");
    anonymous
        .get("/all_urls/")
        .await
        .assert_redirect("/?next=%2Fall_urls%2F");

    let mut parent = anonymous.stranger();
    parent.sign_up("robin").await;
    parent.get("/admin/").await.assert_redirect("/homepage/");
    parent
        .post_form("/symptom/delete/", &[("id", "1")])
        .await
        .assert_redirect("/homepage/");

    let mut editor = anonymous.stranger();
    editor.sign_up_editor("ed").await;
    assert_eq!(editor.get("/admin/").await.status, StatusCode::OK);
}

#[tokio::test]
async fn symptoms_are_normalized_sanitized_and_unique() {
    let mut app = TestApp::new();
    app.sign_up_editor("ed").await;

    app.post_form(
        "/admin/",
        &[
            ("name", "Chicken Pox"),
            ("description", "<p>Itchy spots<script>alert(1)</script></p>"),
        ],
    )
    .await
    .assert_redirect("/admin/");

    let stored = app
        .backend
        .find_category_by_name("chicken_pox")
        .await
        .expect("lookup")
        .expect("symptom stored under its normalized name");
    assert_eq!(stored.description, "<p>Itchy spots</p>");

    let duplicate = app
        .post_form("/admin/", &[("name", "chicken pox"), ("description", "")])
        .await;
    assert_eq!(duplicate.status, StatusCode::OK);
    assert!(duplicate.body.contains("already exists"));

    let id = stored.id.to_string();
    app.post_form(
        "/admin/",
        &[("id", &id), ("name", "Chickenpox"), ("description", "Renamed")],
    )
    .await
    .assert_redirect("/admin/");
    let renamed = app
        .backend
        .find_category(stored.id)
        .await
        .expect("lookup")
        .expect("still present");
    assert_eq!(renamed.name, "chickenpox");
}

#[tokio::test]
async fn headings_and_sub_headings_round_trip_through_the_forms() {
    let mut app = TestApp::new();
    app.sign_up_editor("ed").await;
    app.post_form("/admin/", &[("name", "Rash"), ("description", "")])
        .await
        .assert_redirect("/admin/");
    let rash = app
        .backend
        .find_category_by_name("rash")
        .await
        .expect("lookup")
        .expect("rash");

    let form = app
        .get(&format!("/admin/heading/0?category={}", rash.id))
        .await;
    assert_eq!(form.status, StatusCode::OK);

    app.post_form(
        "/admin/heading/0",
        &[("category_id", &rash.id.to_string()), ("text", "Causes")],
    )
    .await
    .assert_redirect("/admin/rash");
    let heading = app.backend.list_headings(rash.id).await.expect("headings")[0].clone();

    let path = format!("/admin/subheading/{}/0", heading.id);
    assert_eq!(app.get(&path).await.status, StatusCode::OK);

    let no_groups = app
        .post_form(
            &path,
            &[("heading_id", &heading.id.to_string()), ("title", "Heat rash"), ("text", "")],
        )
        .await;
    assert_eq!(no_groups.status, StatusCode::OK);
    assert!(no_groups.body.contains("select at least one age group"));

    app.post_form(
        &path,
        &[
            ("heading_id", &heading.id.to_string()),
            ("title", "Heat rash"),
            ("text", "<p>Cool them down.</p>"),
            ("age_groups", "5"),
            ("age_groups", "0"),
            ("age_groups", "9"),
        ],
    )
    .await
    .assert_redirect("/admin/rash");

    let subs = app
        .backend
        .list_sub_headings(heading.id)
        .await
        .expect("sub-headings");
    assert_eq!(subs.len(), 1);
    assert_eq!(
        subs[0].age_groups,
        vec![AgeGroup::UnderOneMonth, AgeGroup::TwoToFiveYears]
    );

    let detail = app.get("/admin/rash").await;
    assert!(detail.body.contains("Heat rash"));

    app.post_form(
        &format!("/admin/subheading/{}/{}", heading.id, subs[0].id),
        &[("delete", "1")],
    )
    .await
    .assert_redirect("/admin/rash");
    assert!(
        app.backend
            .list_sub_headings(heading.id)
            .await
            .expect("sub-headings")
            .is_empty()
    );

    app.post_form(&format!("/admin/heading/{}", heading.id), &[("delete", "1")])
        .await
        .assert_redirect("/admin/rash");
    assert!(app.backend.find_heading(heading.id).await.expect("lookup").is_none());
}

#[tokio::test]
async fn missing_records_lead_back_to_the_console() {
    let mut app = TestApp::new();
    app.sign_up_editor("ed").await;
    app.get("/admin/no_such_symptom").await.assert_redirect("/admin/");
    app.get("/admin/heading/777").await.assert_redirect("/admin/");
    app.get("/admin/subheading/777/0").await.assert_redirect("/admin/");
}

#[tokio::test]
async fn link_index_lists_every_public_url() {
    let mut app = TestApp::new();
    let seeded = seed_content(&app.backend).await;
    app.sign_up_editor("ed").await;

    let links = app.get("/all_urls/").await.json();
    let links = links.as_array().expect("array of links");
    assert_eq!(links.len(), 4);
    assert!(links.contains(&json!({
        "name": "Symptom: High Temperature",
        "url": "/symptom/high_temperature",
    })));
    assert!(links.contains(&json!({
        "name": "Heading: When to get help",
        "url": seeded.heading.url(),
    })));
    assert!(links.contains(&json!({
        "name": "Sub Heading: Newborn fever (less than 1 month, 1-3 months)",
        "url": seeded.infant.url(),
    })));
}

#[tokio::test]
async fn deleting_a_symptom_removes_its_tree() {
    let mut app = TestApp::new();
    let seeded = seed_content(&app.backend).await;
    app.sign_up_editor("ed").await;

    let id = seeded.category.id.to_string();
    let deleted = app.post_form("/symptom/delete/", &[("id", &id)]).await;
    assert_eq!(deleted.json(), json!({"status": 1, "id": seeded.category.id}));

    assert!(app.backend.find_heading(seeded.heading.id).await.expect("lookup").is_none());
    assert!(
        app.backend
            .find_sub_heading(seeded.infant.id)
            .await
            .expect("lookup")
            .is_none()
    );

    let again = app.post_form("/symptom/delete/", &[("id", &id)]).await;
    assert_eq!(again.json(), json!({"status": 0}));
}
