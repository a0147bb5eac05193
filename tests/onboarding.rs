mod support;

use asksniff::domain::types::AgeGroup;
use axum::http::{StatusCode, header};
use support::TestApp;

#[tokio::test]
async fn first_contact_issues_an_http_only_session_cookie() {
    let mut app = TestApp::new();
    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    let set_cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("first response should set the session cookie");
    assert!(set_cookie.starts_with("session_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));

    let again = app.get("/").await;
    assert!(
        again.headers.get(header::SET_COOKIE).is_none(),
        "a known session keeps its cookie"
    );
}

#[tokio::test]
async fn content_requires_disclaimer_before_age() {
    let mut app = TestApp::new();

    app.get("/symptom/rash")
        .await
        .assert_redirect("/disclaimer/?next=%2Fsymptom%2Frash");

    app.post_form("/disclaimer/?next=%2Fsymptom%2Frash", &[])
        .await
        .assert_redirect("/noUser/age/?next=%2Fsymptom%2Frash");

    app.get("/homepage/")
        .await
        .assert_redirect("/noUser/age/?next=%2Fhomepage%2F");

    app.post_form("/noUser/age/?next=%2Fsymptom%2Frash", &[("age", "2")])
        .await
        .assert_redirect("/symptom/rash");

    let homepage = app.get("/homepage/").await;
    assert_eq!(homepage.status, StatusCode::OK);
    assert!(homepage.body.contains("3-6 months"));
}

#[tokio::test]
async fn age_selection_is_behind_the_disclaimer() {
    let mut app = TestApp::new();
    app.get("/noUser/age/")
        .await
        .assert_redirect("/disclaimer/?next=%2FnoUser%2Fage%2F");
    app.post_form("/noUser/age/", &[("age", "3")])
        .await
        .assert_redirect("/disclaimer/?next=%2FnoUser%2Fage%2F");
}

#[tokio::test]
async fn showing_the_disclaimer_again_resets_choices() {
    let mut app = TestApp::new();
    app.onboard_anonymous(AgeGroup::SixToTwelveMonths).await;
    app.get("/").await.assert_redirect("/homepage/");

    let disclaimer = app.get("/disclaimer/").await;
    assert_eq!(disclaimer.status, StatusCode::OK);

    app.get("/homepage/")
        .await
        .assert_redirect("/disclaimer/?next=%2Fhomepage%2F");
    let index = app.get("/").await;
    assert_eq!(index.status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_age_codes_fall_back_to_the_youngest_group() {
    let mut app = TestApp::new();
    app.get("/disclaimer/").await;
    app.post_form("/disclaimer/", &[]).await;
    app.post_form("/noUser/age/", &[("age", "99")])
        .await
        .assert_redirect("/homepage/");

    let homepage = app.get("/homepage/").await;
    assert!(homepage.body.contains("less than 1 month"));
}

#[tokio::test]
async fn offsite_next_targets_are_ignored() {
    let mut app = TestApp::new();
    app.get("/disclaimer/").await;
    app.post_form("/disclaimer/?next=https%3A%2F%2Fevil.example", &[])
        .await
        .assert_redirect("/noUser/age/");
    app.post_form("/noUser/age/?next=%2F%2Fevil.example", &[("age", "1")])
        .await
        .assert_redirect("/homepage/");
}

#[tokio::test]
async fn unknown_paths_render_not_found() {
    let mut app = TestApp::new();
    let response = app.get("/no/such/page").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_probe_reports_no_content() {
    let mut app = TestApp::new();
    let response = app.get("/_health/db").await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn stylesheet_is_served_from_embedded_assets() {
    let mut app = TestApp::new();
    let response = app.get("/static/css/site.css").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/css")
    );
}
