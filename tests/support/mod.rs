#![allow(dead_code)]

use std::sync::Arc;

use asksniff::{
    application::repos::{
        CategoryParams, ChildrenRepo, ContentWriteRepo, Repositories, SubHeadingParams,
        UsersRepo,
    },
    config::{self, CliArgs},
    domain::{
        entities::{CategoryRecord, HeadingRecord, SubHeadingRecord},
        types::AgeGroup,
    },
    infra::{
        http::{HttpState, build_router},
        memory::MemoryRepositories,
    },
    util::clock::{Clock, ManualClock},
};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::Response,
};
use clap::Parser;
use http_body_util::BodyExt;
use time::macros::datetime;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse";

/// The router over a fresh in-memory backend, with a cookie-carrying client.
pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MemoryRepositories>,
    pub clock: Arc<ManualClock>,
    pub state: HttpState,
    cookie: Option<String>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body should be JSON")
    }

    #[track_caller]
    pub fn assert_redirect(&self, target: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location(), target);
    }
}

pub fn settings() -> config::Settings {
    let cli = CliArgs::parse_from(["asksniff", "serve"]);
    let mut settings = config::load(&cli).expect("default settings should load");
    settings.accounts.bcrypt_cost = 4;
    settings.database.url = None;
    settings
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(settings())
    }

    pub fn with_settings(settings: config::Settings) -> Self {
        let backend = Arc::new(MemoryRepositories::new());
        let clock = Arc::new(ManualClock::new(datetime!(2026-10-16 09:00 UTC)));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let state = HttpState::new(
            Repositories::from_backend(backend.clone()),
            &settings,
            dyn_clock,
        );
        Self {
            router: build_router(state.clone()),
            backend,
            clock,
            state,
            cookie: None,
        }
    }

    /// A second client sharing this app's storage but not its session.
    pub fn stranger(&self) -> Self {
        Self {
            router: self.router.clone(),
            backend: self.backend.clone(),
            clock: self.clock.clone(),
            state: self.state.clone(),
            cookie: None,
        }
    }

    pub fn session_cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request(Method::GET, uri).body(Body::empty());
        self.send(request.expect("request should build")).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body));
        self.send(request.expect("request should build")).await
    }

    fn request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response: Response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
        {
            if let Some(pair) = set_cookie.split(';').next() {
                self.cookie = Some(pair.trim().to_string());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Accept the disclaimer and pick an age group as an anonymous visitor.
    pub async fn onboard_anonymous(&mut self, age: AgeGroup) {
        self.get("/disclaimer/").await;
        self.post_form("/disclaimer/", &[]).await;
        let code = age.code().to_string();
        let response = self.post_form("/noUser/age/", &[("age", &code)]).await;
        response.assert_redirect("/homepage/");
    }

    /// Create an account and accept the disclaimer as that user.
    pub async fn sign_up(&mut self, username: &str) {
        let email = format!("{username}@example.com");
        let response = self
            .post_form(
                "/accounts/signup/",
                &[
                    ("username", username),
                    ("email", &email),
                    ("password", PASSWORD),
                    ("redirect", ""),
                ],
            )
            .await;
        response.assert_redirect("/disclaimer/");
        self.get("/disclaimer/").await;
        self.post_form("/disclaimer/", &[])
            .await
            .assert_redirect("/homepage/");
    }

    pub async fn sign_up_editor(&mut self, username: &str) {
        self.sign_up(username).await;
        let granted = self
            .backend
            .set_editor(username, true)
            .await
            .expect("editor grant should succeed");
        assert!(granted);
    }

    /// Add a child through the form and return its id.
    pub async fn add_child(&mut self, name: &str, dob: &str) -> i64 {
        self.post_form("/child/", &[("childName", name), ("dob", dob)])
            .await
            .assert_redirect("/child/");
        let user = self
            .backend
            .find_user_by_username(&self.current_username().await)
            .await
            .expect("user lookup")
            .expect("signed in user");
        self.backend
            .list_children(user.id)
            .await
            .expect("children lookup")
            .into_iter()
            .find(|child| child.name == name)
            .expect("child should be stored")
            .id
    }

    pub async fn user_id(&self, username: &str) -> i64 {
        self.backend
            .find_user_by_username(username)
            .await
            .expect("user lookup")
            .expect("user exists")
            .id
    }

    async fn current_username(&self) -> String {
        let cookie = self.cookie.as_deref().expect("session cookie");
        let id = cookie.split_once('=').map(|(_, id)| id).unwrap_or_default();
        let session = self
            .state
            .sessions
            .load(id)
            .await
            .expect("session should exist");
        let user_id = session.user_id.expect("session should be signed in");
        self.backend
            .find_user(user_id)
            .await
            .expect("user lookup")
            .expect("user exists")
            .username
    }
}

pub struct SeededContent {
    pub category: CategoryRecord,
    pub heading: HeadingRecord,
    pub infant: SubHeadingRecord,
    pub toddler: SubHeadingRecord,
}

/// One symptom with a heading holding an infant-only and a toddler-only section.
pub async fn seed_content(backend: &MemoryRepositories) -> SeededContent {
    let category = backend
        .create_category(CategoryParams {
            name: "high_temperature".into(),
            description: "<p>A temperature of 38C or more.</p>".into(),
        })
        .await
        .expect("category");
    let heading = backend
        .create_heading(category.id, "When to get help")
        .await
        .expect("heading");
    let infant = backend
        .create_sub_heading(SubHeadingParams {
            heading_id: heading.id,
            title: "Newborn fever".into(),
            text: "<p>Call your doctor straight away.</p>".into(),
            age_groups: vec![AgeGroup::UnderOneMonth, AgeGroup::OneToThreeMonths],
            edited_at: datetime!(2026-10-01 12:00 UTC),
        })
        .await
        .expect("infant sub-heading");
    let toddler = backend
        .create_sub_heading(SubHeadingParams {
            heading_id: heading.id,
            title: "Toddler fever".into(),
            text: "<p>Keep them drinking fluids.</p>".into(),
            age_groups: vec![AgeGroup::TwoToFiveYears],
            edited_at: datetime!(2026-10-01 12:00 UTC),
        })
        .await
        .expect("toddler sub-heading");
    SeededContent {
        category,
        heading,
        infant,
        toddler,
    }
}
