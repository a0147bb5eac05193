//! Preconditions checked at the top of every content handler.
//!
//! Gates only read the viewer. A failing gate names the page that satisfies
//! the missing precondition and carries the requested path along as `next`
//! so the visitor lands where they were going once it is met.

use url::form_urlencoded;

use crate::application::viewer::Viewer;

pub const DISCLAIMER_PATH: &str = "/disclaimer/";
pub const AGE_SELECTION_PATH: &str = "/noUser/age/";
pub const HOMEPAGE_PATH: &str = "/homepage/";
pub const INDEX_PATH: &str = "/";
pub const CHILD_PATH: &str = "/child/";

/// Where a visitor stands on the way to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorState {
    /// Fresh anonymous session with no choices recorded.
    Anonymous,
    /// Signed in or carrying an old age choice, but the disclaimer is unset.
    DisclaimerPending,
    /// Disclaimer accepted, anonymous, no age chosen yet.
    AgePending,
    Ready,
}

impl VisitorState {
    pub fn of(viewer: &Viewer) -> Self {
        let has_age = viewer.is_authenticated() || viewer.session.age_range.is_some();
        match (viewer.session.disclaimer, has_age) {
            (false, false) => VisitorState::Anonymous,
            (false, true) => VisitorState::DisclaimerPending,
            (true, false) => VisitorState::AgePending,
            (true, true) => VisitorState::Ready,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Pass,
    Redirect(String),
}

impl GateOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass)
    }
}

pub fn disclaimer_gate(viewer: &Viewer, requested: &str) -> GateOutcome {
    if viewer.session.disclaimer {
        GateOutcome::Pass
    } else {
        GateOutcome::Redirect(with_next(DISCLAIMER_PATH, requested))
    }
}

pub fn age_gate(viewer: &Viewer, requested: &str) -> GateOutcome {
    if viewer.is_authenticated() || viewer.session.age_range.is_some() {
        GateOutcome::Pass
    } else {
        GateOutcome::Redirect(with_next(AGE_SELECTION_PATH, requested))
    }
}

/// Disclaimer first, then age.
pub fn content_gate(viewer: &Viewer, requested: &str) -> GateOutcome {
    match disclaimer_gate(viewer, requested) {
        GateOutcome::Pass => age_gate(viewer, requested),
        redirect => redirect,
    }
}

pub fn login_gate(viewer: &Viewer, requested: &str) -> GateOutcome {
    if viewer.is_authenticated() {
        GateOutcome::Pass
    } else {
        GateOutcome::Redirect(with_next(INDEX_PATH, requested))
    }
}

pub fn editor_gate(viewer: &Viewer) -> GateOutcome {
    if viewer.is_editor() {
        GateOutcome::Pass
    } else {
        GateOutcome::Redirect(HOMEPAGE_PATH.to_string())
    }
}

/// Accept only same-site absolute paths as redirect targets.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.map(str::trim)
        .filter(|target| target.starts_with('/') && !target.starts_with("//"))
        .filter(|target| !target.contains('\\'))
}

pub fn with_next(path: &str, next: &str) -> String {
    match safe_next(Some(next)) {
        Some(target) => {
            let query: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("next", target)
                .finish();
            format!("{path}?{query}")
        }
        None => path.to_string(),
    }
}
