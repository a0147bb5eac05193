//! Session transitions of the disclaimer and age-selection pages.

use crate::{
    application::{
        gate::{AGE_SELECTION_PATH, HOMEPAGE_PATH, VisitorState, safe_next, with_next},
        viewer::{SessionState, Viewer},
    },
    domain::types::AgeGroup,
};

/// Showing the disclaimer starts the visit over.
pub fn reset_for_disclaimer(session: &mut SessionState) {
    session.disclaimer = false;
    session.age_range = None;
}

/// Record acceptance and decide where the visitor goes next.
pub fn accept_disclaimer(viewer: &mut Viewer, next: Option<&str>) -> String {
    viewer.session.disclaimer = true;
    let next = safe_next(next);
    match VisitorState::of(viewer) {
        VisitorState::Ready => next.unwrap_or(HOMEPAGE_PATH).to_string(),
        _ => match next {
            Some(target) => with_next(AGE_SELECTION_PATH, target),
            None => AGE_SELECTION_PATH.to_string(),
        },
    }
}

/// Parse a submitted age code. Missing or unknown input selects group 0.
pub fn parse_age_choice(raw: Option<&str>) -> AgeGroup {
    raw.and_then(|value| value.parse::<AgeGroup>().ok())
        .unwrap_or(AgeGroup::UnderOneMonth)
}

pub fn select_age(session: &mut SessionState, raw: Option<&str>, next: Option<&str>) -> String {
    session.age_range = Some(parse_age_choice(raw));
    session.disclaimer = true;
    safe_next(next).unwrap_or(HOMEPAGE_PATH).to_string()
}

/// Forget everything the session knows about the visitor.
pub fn sign_out(session: &mut SessionState) {
    *session = SessionState::default();
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::entities::UserRecord;

    fn parent() -> UserRecord {
        UserRecord {
            id: 1,
            username: "p".into(),
            email: "p@example.com".into(),
            password_hash: String::new(),
            is_editor: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn anonymous_acceptance_leads_to_age_selection() {
        let mut viewer = Viewer::default();
        assert_eq!(accept_disclaimer(&mut viewer, None), "/noUser/age/");
        assert!(viewer.session.disclaimer);

        let mut viewer = Viewer::default();
        assert_eq!(
            accept_disclaimer(&mut viewer, Some("/symptom/rash")),
            "/noUser/age/?next=%2Fsymptom%2Frash"
        );
    }

    #[test]
    fn authenticated_acceptance_resumes_or_goes_home() {
        let mut viewer = Viewer {
            user: Some(parent()),
            session: SessionState::default(),
        };
        assert_eq!(accept_disclaimer(&mut viewer, None), "/homepage/");
        assert_eq!(accept_disclaimer(&mut viewer, Some("/diary/")), "/diary/");
        assert_eq!(
            accept_disclaimer(&mut viewer, Some("https://elsewhere")),
            "/homepage/"
        );
    }

    #[test]
    fn age_selection_defaults_to_first_group() {
        let mut session = SessionState::default();
        assert_eq!(select_age(&mut session, Some("4"), None), "/homepage/");
        assert_eq!(session.age_range, Some(AgeGroup::TwelveToTwentyFourMonths));
        assert!(session.disclaimer);

        select_age(&mut session, Some("banana"), Some("/search/"));
        assert_eq!(session.age_range, Some(AgeGroup::UnderOneMonth));
        select_age(&mut session, None, None);
        assert_eq!(session.age_range, Some(AgeGroup::UnderOneMonth));
    }

    #[test]
    fn reset_and_sign_out_clear_choices() {
        let mut session = SessionState {
            user_id: Some(3),
            disclaimer: true,
            age_range: Some(AgeGroup::TwoToFiveYears),
        };
        reset_for_disclaimer(&mut session);
        assert_eq!(session.user_id, Some(3));
        assert!(!session.disclaimer);
        assert_eq!(session.age_range, None);

        sign_out(&mut session);
        assert_eq!(session, SessionState::default());
    }
}
