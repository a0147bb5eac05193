//! Cookie-keyed sessions.
//!
//! Every request gets a [`Viewer`] built from the server-side session named by
//! the session cookie. Handlers that change session data attach a
//! [`SessionUpdate`] to their response; the middleware persists it after the
//! handler returns. A fresh session and cookie are issued on first contact,
//! and sign-in and sign-out move the data to a new id.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, warn};

use crate::{
    application::{
        error::HttpError,
        repos::RepoError,
        viewer::{SessionState, Viewer},
    },
    config::SessionSettings,
};

use super::HttpState;

/// New session data produced by a handler.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub state: SessionState,
    /// Move the data to a new session id.
    pub renew: bool,
}

impl SessionUpdate {
    pub fn save(state: SessionState) -> Self {
        Self {
            state,
            renew: false,
        }
    }

    pub fn renew(state: SessionState) -> Self {
        Self { state, renew: true }
    }

    pub fn attach(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// The viewer of the current request; anonymous when no session layer ran.
pub struct CurrentViewer(pub Viewer);

impl<S: Send + Sync> FromRequestParts<S> for CurrentViewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts.extensions.get::<Viewer>().cloned().unwrap_or_default(),
        ))
    }
}

pub async fn attach_session(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let mut current_id = None;
    let mut session = SessionState::default();
    if let Some(cookie) = jar.get(&state.session.cookie_name) {
        if let Some(stored) = state.sessions.load(cookie.value()).await {
            current_id = Some(cookie.value().to_string());
            session = stored;
        }
    }

    let viewer = match load_viewer(&state, session).await {
        Ok(viewer) => viewer,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let initial = viewer.session.clone();
    request.extensions_mut().insert(viewer);

    let mut response = next.run(request).await;

    let id = match (response.extensions_mut().remove::<SessionUpdate>(), current_id) {
        (Some(update), Some(id)) if !update.renew => {
            state.sessions.save(&id, update.state).await;
            return response;
        }
        (Some(update), previous) => {
            if let Some(previous) = previous {
                state.sessions.remove(&previous).await;
            }
            state.sessions.create(update.state).await
        }
        (None, Some(_)) => return response,
        (None, None) => state.sessions.create(initial).await,
    };

    debug!(target = "asksniff::http::session", "Issued session cookie");
    (jar.add(session_cookie(&state.session, id)), response).into_response()
}

/// Resolve the signed-in user; a session pointing at a removed account is
/// treated as signed out.
async fn load_viewer(state: &HttpState, mut session: SessionState) -> Result<Viewer, RepoError> {
    let Some(user_id) = session.user_id else {
        return Ok(Viewer::anonymous(session));
    };

    match state.accounts.current_user(user_id).await? {
        Some(user) => Ok(Viewer {
            user: Some(user),
            session,
        }),
        None => {
            warn!(
                target = "asksniff::http::session",
                user_id, "Session refers to a missing account"
            );
            session.user_id = None;
            Ok(Viewer::anonymous(session))
        }
    }
}

fn session_cookie(settings: &SessionSettings, id: String) -> Cookie<'static> {
    Cookie::build((settings.cookie_name.clone(), id))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::try_from(settings.max_age).unwrap_or(time::Duration::MAX))
        .build()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn cookie_is_http_only_and_scoped_to_root() {
        let settings = SessionSettings {
            cookie_name: "session_id".into(),
            secure: true,
            max_age: Duration::from_secs(3600),
        };
        let cookie = session_cookie(&settings, "abc".into());
        let header = cookie.to_string();
        assert!(header.starts_with("session_id=abc"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=3600"));
    }

    #[test]
    fn updates_ride_on_response_extensions() {
        let state = SessionState {
            disclaimer: true,
            ..SessionState::default()
        };
        let response = SessionUpdate::renew(state.clone()).attach(());
        let update = response
            .extensions()
            .get::<SessionUpdate>()
            .expect("update attached");
        assert!(update.renew);
        assert_eq!(update.state, state);
    }
}
