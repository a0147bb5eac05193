mod accounts;
mod admin;
mod children;
mod diary;
mod middleware;
mod public;
mod session;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{OriginalUri, State},
    http::{HeaderValue, StatusCode, header::LOCATION},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::debug;

pub use session::{CurrentViewer, SessionUpdate};

use crate::{
    application::{
        accounts::AccountsService,
        admin::AdminContentService,
        children::ChildrenService,
        content::ContentService,
        diary::DiaryService,
        error::{ErrorReport, HttpError},
        gate::{GateOutcome, INDEX_PATH, disclaimer_gate, login_gate},
        repos::{HealthRepo, RepoError, Repositories},
        viewer::{AgeResolver, Viewer},
    },
    cache::{CacheConfig, ContentCache},
    config::{SessionSettings, Settings},
    infra::{
        assets::serve_static, passwords::BcryptHasher, sessions::SessionStore,
        telemetry::METRIC_GATE_REDIRECT,
    },
    util::clock::Clock,
};

use self::middleware::{log_responses, set_request_context};

/// Everything a handler can reach.
#[derive(Clone)]
pub struct HttpState {
    pub content: Arc<ContentService>,
    pub resolver: Arc<AgeResolver>,
    pub accounts: Arc<AccountsService>,
    pub children: Arc<ChildrenService>,
    pub diary: Arc<DiaryService>,
    pub admin: Arc<AdminContentService>,
    pub sessions: Arc<SessionStore>,
    pub session: SessionSettings,
    pub health: Arc<dyn HealthRepo>,
    pub clock: Arc<dyn Clock>,
    pub maps_api_key: Option<String>,
}

impl HttpState {
    /// Wire the services over `repos` as configured by `settings`.
    pub fn new(repos: Repositories, settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(ContentCache::new(
            &CacheConfig::from(&settings.cache),
            clock.clone(),
        ));
        let hasher = Arc::new(BcryptHasher::new(settings.accounts.bcrypt_cost));

        Self {
            content: Arc::new(ContentService::new(repos.content.clone(), cache)),
            resolver: Arc::new(AgeResolver::new(repos.children.clone(), clock.clone())),
            accounts: Arc::new(AccountsService::new(
                repos.users.clone(),
                hasher,
                clock.clone(),
            )),
            children: Arc::new(ChildrenService::new(repos.children.clone(), clock.clone())),
            diary: Arc::new(DiaryService::new(
                repos.children.clone(),
                repos.diary.clone(),
                clock.clone(),
            )),
            admin: Arc::new(AdminContentService::new(
                repos.content,
                repos.content_write,
                clock.clone(),
            )),
            sessions: Arc::new(SessionStore::new(settings.session.max_age, clock.clone())),
            session: settings.session.clone(),
            health: repos.health,
            clock,
            maps_api_key: settings.maps.api_key.clone(),
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    let public_routes = Router::new()
        .route("/", get(public::index))
        .route(
            "/disclaimer/",
            get(public::disclaimer).post(public::accept_disclaimer),
        )
        .route(
            "/noUser/age/",
            get(public::age_selection).post(public::select_age),
        )
        .route("/homepage/", get(public::homepage))
        .route("/symptom/{name}", get(public::symptom))
        .route(
            "/symptom/information/{heading_id}",
            get(public::heading),
        )
        .route("/search/", get(public::search_page).post(public::search))
        .route("/map/", get(public::map));

    let account_routes = Router::new()
        .route("/accounts/login/", post(accounts::login))
        .route("/accounts/signup/", post(accounts::signup))
        .route("/accounts/logout/", get(accounts::logout))
        .route(
            "/accounts/forgot/",
            get(accounts::forgot_password).post(accounts::reset_password),
        );

    let child_routes = Router::new()
        .route("/child/", get(children::my_children).post(children::add_child))
        .route(
            "/child/manage/",
            get(children::manage_children).post(children::edit_child),
        )
        .route("/childActivate/", post(children::activate_child))
        .route("/childDelete/", post(children::delete_child))
        .route("/diary/", get(diary::diary_children))
        .route("/diary/delete/", post(diary::delete_log))
        .route("/diary/{child_id}", get(diary::child_logs).post(diary::save_log));

    let editor_routes = Router::new()
        .route("/admin/", get(admin::symptoms).post(admin::save_symptom))
        .route("/admin/{symptom}", get(admin::symptom_detail))
        .route(
            "/admin/heading/{id}",
            get(admin::heading_form).post(admin::save_heading),
        )
        .route(
            "/admin/subheading/{heading_id}/{id}",
            get(admin::sub_heading_form).post(admin::save_sub_heading),
        )
        .route("/symptom/delete/", post(admin::delete_symptom))
        .route("/all_urls/", get(admin::all_urls));

    let system_routes = Router::new()
        .route("/_health/db", get(db_health))
        .route("/static/{*path}", get(serve_static));

    public_routes
        .merge(account_routes)
        .merge(child_routes)
        .merge(editor_routes)
        .merge(system_routes)
        .fallback(public::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session::attach_session,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .with_state(state)
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// A response that ends the handler early: a gate redirect or an error.
pub(crate) struct Rejection(Response);

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        self.0
    }
}

impl From<HttpError> for Rejection {
    fn from(error: HttpError) -> Self {
        Self(error.into_response())
    }
}

impl From<RepoError> for Rejection {
    fn from(error: RepoError) -> Self {
        HttpError::from(error).into()
    }
}

impl From<Response> for Rejection {
    fn from(response: Response) -> Self {
        Self(response)
    }
}

pub(crate) type HandlerResult = Result<Response, Rejection>;

/// Stop with a redirect unless the gate passes.
pub(crate) fn require(outcome: GateOutcome) -> Result<(), Rejection> {
    match outcome {
        GateOutcome::Pass => Ok(()),
        GateOutcome::Redirect(target) => {
            metrics::counter!(METRIC_GATE_REDIRECT).increment(1);
            debug!(target = "asksniff::http::gate", to = %target, "Gate redirect");
            Err(Rejection(see_other(&target)))
        }
    }
}

/// Path and query of the request, used as the `next` target of gate redirects.
pub(crate) fn requested(OriginalUri(uri): &OriginalUri) -> String {
    uri.path_and_query()
        .map(|target| target.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Id of a signed-in viewer who has accepted the disclaimer.
pub(crate) fn require_member(viewer: &Viewer, uri: &OriginalUri) -> Result<i64, Rejection> {
    let requested = requested(uri);
    require(login_gate(viewer, &requested))?;
    require(disclaimer_gate(viewer, &requested))?;
    viewer
        .user_id()
        .ok_or_else(|| see_other(INDEX_PATH).into())
}

/// 303 to `target`; targets that cannot be a header value go to the index.
pub(crate) fn see_other(target: &str) -> Response {
    let location =
        HeaderValue::try_from(target).unwrap_or_else(|_| HeaderValue::from_static(INDEX_PATH));
    (StatusCode::SEE_OTHER, [(LOCATION, location)]).into_response()
}

/// Plain-text HTTP error for failures that have no form to report on.
pub(crate) fn internal_error(source: &'static str, error: &dyn std::error::Error) -> Rejection {
    HttpError::from_error(
        source,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        error,
    )
    .into()
}

pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// `{"status":1}` / `{"status":0}`, with the affected id where the browser needs it.
#[derive(Debug, Serialize)]
pub(crate) struct StatusBody {
    status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

impl StatusBody {
    pub(crate) fn ok() -> Json<Self> {
        Json(Self {
            status: 1,
            id: None,
        })
    }

    pub(crate) fn ok_with_id(id: i64) -> Json<Self> {
        Json(Self {
            status: 1,
            id: Some(id),
        })
    }

    pub(crate) fn failed() -> Json<Self> {
        Json(Self {
            status: 0,
            id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_maps_failures_to_503_with_report() {
        assert_eq!(db_health_response(Ok(())).status(), StatusCode::NO_CONTENT);
        let response = db_health_response(Err(RepoError::Timeout));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn status_bodies_serialize_compactly() {
        let ok = serde_json::to_string(&StatusBody::ok().0).expect("json");
        assert_eq!(ok, r#"{"status":1}"#);
        let deleted = serde_json::to_string(&StatusBody::ok_with_id(4).0).expect("json");
        assert_eq!(deleted, r#"{"status":1,"id":4}"#);
        let failed = serde_json::to_string(&StatusBody::failed().0).expect("json");
        assert_eq!(failed, r#"{"status":0}"#);
    }

    #[test]
    fn gate_redirects_become_303() {
        let rejection = require(GateOutcome::Redirect("/disclaimer/".into())).err();
        let response = rejection.map(IntoResponse::into_response);
        assert_eq!(
            response.map(|response| response.status()),
            Some(StatusCode::SEE_OTHER)
        );
        assert!(require(GateOutcome::Pass).is_ok());
    }

    #[test]
    fn unrepresentable_redirect_targets_fall_back_to_index() {
        let response = see_other("/symptom/fièvre");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/");
        let response = see_other("/diary/3");
        assert_eq!(response.headers()[LOCATION], "/diary/3");
    }
}
