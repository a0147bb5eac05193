use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    application::{
        accounts::AccountError,
        gate::{DISCLAIMER_PATH, INDEX_PATH, safe_next, with_next},
        onboarding,
        viewer::{SessionState, Viewer},
    },
    domain::entities::UserRecord,
    presentation::views::{
        ForgotPasswordTemplate, IndexTemplate, PageChrome, render_template_response,
    },
};

use super::{CurrentViewer, HandlerResult, HttpState, Rejection, SessionUpdate, see_other};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    username: String,
    password: String,
    redirect: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupForm {
    username: String,
    password: String,
    email: String,
    redirect: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ResetForm {
    username: String,
    email: String,
    password: String,
}

pub(super) async fn login(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Form(form): Form<LoginForm>,
) -> HandlerResult {
    match state.accounts.login(&form.username, &form.password).await {
        Ok(user) => Ok(signed_in(viewer.session, &user, &form.redirect)),
        Err(err) => index_with_error(&viewer, form.redirect, err),
    }
}

pub(super) async fn signup(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Form(form): Form<SignupForm>,
) -> HandlerResult {
    match state
        .accounts
        .signup(&form.username, &form.email, &form.password)
        .await
    {
        Ok(user) => Ok(signed_in(viewer.session, &user, &form.redirect)),
        Err(err) => index_with_error(&viewer, form.redirect, err),
    }
}

pub(super) async fn logout(CurrentViewer(viewer): CurrentViewer) -> Response {
    let mut session = viewer.session;
    if let Some(user_id) = session.user_id {
        info!(target = "asksniff::http::accounts", user_id, "Signed out");
    }
    onboarding::sign_out(&mut session);
    SessionUpdate::renew(session).attach(see_other(INDEX_PATH))
}

pub(super) async fn forgot_password(CurrentViewer(viewer): CurrentViewer) -> Response {
    forgot_page(&viewer, None)
}

pub(super) async fn reset_password(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Form(form): Form<ResetForm>,
) -> HandlerResult {
    match state
        .accounts
        .reset_password(&form.username, &form.email, &form.password)
        .await
    {
        Ok(()) => Ok(see_other(INDEX_PATH)),
        Err(err) => match err.form_message() {
            Some(message) => Ok(forgot_page(&viewer, Some(message))),
            None => Err(account_failure(err)),
        },
    }
}

/// Bind the session to `user` under a fresh id; the disclaimer is shown again
/// before any content.
fn signed_in(mut session: SessionState, user: &UserRecord, redirect: &str) -> Response {
    session.user_id = Some(user.id);
    info!(
        target = "asksniff::http::accounts",
        user_id = user.id,
        "Signed in"
    );
    let next = safe_next(Some(redirect)).unwrap_or_default();
    SessionUpdate::renew(session).attach(see_other(&with_next(DISCLAIMER_PATH, next)))
}

fn index_with_error(viewer: &Viewer, next: String, err: AccountError) -> HandlerResult {
    let Some(message) = err.form_message() else {
        return Err(account_failure(err));
    };
    Ok(render_template_response(
        IndexTemplate {
            chrome: PageChrome::for_viewer(viewer),
            next,
            error: Some(message.to_string()),
        },
        StatusCode::OK,
    ))
}

fn forgot_page(viewer: &Viewer, error: Option<&str>) -> Response {
    render_template_response(
        ForgotPasswordTemplate {
            chrome: PageChrome::for_viewer(viewer).titled("Reset password"),
            error: error.map(str::to_string),
        },
        StatusCode::OK,
    )
}

fn account_failure(err: AccountError) -> Rejection {
    match err {
        AccountError::Repo(err) => err.into(),
        other => super::internal_error("infra::http::accounts", &other),
    }
}
