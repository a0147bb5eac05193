//! Who is asking, and which age group their content is filtered by.

use std::sync::Arc;

use crate::{
    application::repos::{ChildrenRepo, RepoError},
    domain::{
        age::{age_group_on, age_in_months, age_string},
        entities::UserRecord,
        types::AgeGroup,
    },
    util::clock::Clock,
};

/// Server-side session data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user_id: Option<i64>,
    pub disclaimer: bool,
    pub age_range: Option<AgeGroup>,
}

/// The requester: session state plus the authenticated user, if any.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<UserRecord>,
    pub session: SessionState,
}

impl Viewer {
    pub fn anonymous(session: SessionState) -> Self {
        Self {
            user: None,
            session,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_editor(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.is_editor)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|user| user.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeResolution {
    Group(AgeGroup),
    /// Authenticated, but no child is active.
    NoActiveChild,
    /// Anonymous and no age has been selected.
    Unknown,
}

/// What the banner above content shows, together with the resolved group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerProfile {
    pub age_group: AgeGroup,
    pub child_name: Option<String>,
    pub child_age: Option<String>,
    pub selected_age: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileResolution {
    Ready(ViewerProfile),
    NoActiveChild,
    Unknown,
}

#[derive(Clone)]
pub struct AgeResolver {
    children: Arc<dyn ChildrenRepo>,
    clock: Arc<dyn Clock>,
}

impl AgeResolver {
    pub fn new(children: Arc<dyn ChildrenRepo>, clock: Arc<dyn Clock>) -> Self {
        Self { children, clock }
    }

    pub async fn resolve_age_group(&self, viewer: &Viewer) -> Result<AgeResolution, RepoError> {
        Ok(match self.profile(viewer).await? {
            ProfileResolution::Ready(profile) => AgeResolution::Group(profile.age_group),
            ProfileResolution::NoActiveChild => AgeResolution::NoActiveChild,
            ProfileResolution::Unknown => AgeResolution::Unknown,
        })
    }

    /// Authenticated viewers are filtered by their active child's age; the
    /// session's stored age only applies to anonymous visitors.
    pub async fn profile(&self, viewer: &Viewer) -> Result<ProfileResolution, RepoError> {
        if let Some(user) = &viewer.user {
            let Some(child) = self.children.active_child(user.id).await? else {
                return Ok(ProfileResolution::NoActiveChild);
            };
            let today = self.clock.today();
            return Ok(ProfileResolution::Ready(ViewerProfile {
                age_group: age_group_on(child.dob, today),
                child_age: Some(age_string(age_in_months(child.dob, today))),
                child_name: Some(child.name),
                selected_age: None,
            }));
        }

        Ok(match viewer.session.age_range {
            Some(group) => ProfileResolution::Ready(ViewerProfile {
                age_group: group,
                child_name: None,
                child_age: None,
                selected_age: Some(group.label()),
            }),
            None => ProfileResolution::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::{date, datetime}};

    use super::*;
    use crate::{
        application::repos::CreateChildParams, infra::memory::MemoryRepositories,
        util::clock::ManualClock,
    };

    fn parent(id: i64) -> UserRecord {
        UserRecord {
            id,
            username: format!("parent{id}"),
            email: format!("parent{id}@example.com"),
            password_hash: String::new(),
            is_editor: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn resolver(repo: Arc<MemoryRepositories>) -> AgeResolver {
        AgeResolver::new(
            repo,
            Arc::new(ManualClock::new(datetime!(2026-10-16 09:00 UTC))),
        )
    }

    #[tokio::test]
    async fn anonymous_viewers_use_their_stored_age() {
        let resolver = resolver(Arc::new(MemoryRepositories::new()));

        let unknown = Viewer::anonymous(SessionState::default());
        assert_eq!(
            resolver.resolve_age_group(&unknown).await.expect("resolve"),
            AgeResolution::Unknown
        );

        let chosen = Viewer::anonymous(SessionState {
            disclaimer: true,
            age_range: Some(AgeGroup::SixToTwelveMonths),
            ..SessionState::default()
        });
        let ProfileResolution::Ready(profile) = resolver.profile(&chosen).await.expect("profile")
        else {
            panic!("a stored age should resolve");
        };
        assert_eq!(profile.age_group, AgeGroup::SixToTwelveMonths);
        assert_eq!(profile.selected_age, Some("6-12 months"));
        assert_eq!(profile.child_name, None);
    }

    #[tokio::test]
    async fn signed_in_viewers_follow_the_active_child_not_the_session() {
        let repo = Arc::new(MemoryRepositories::new());
        let resolver = resolver(repo.clone());
        let viewer = Viewer {
            user: Some(parent(1)),
            session: SessionState {
                user_id: Some(1),
                disclaimer: true,
                age_range: Some(AgeGroup::UnderOneMonth),
            },
        };

        assert_eq!(
            resolver.resolve_age_group(&viewer).await.expect("resolve"),
            AgeResolution::NoActiveChild
        );

        repo.create_child(CreateChildParams {
            user_id: 1,
            name: "Sam".into(),
            dob: date!(2025 - 04 - 10),
        })
        .await
        .expect("child");

        let ProfileResolution::Ready(profile) = resolver.profile(&viewer).await.expect("profile")
        else {
            panic!("an active child should resolve");
        };
        assert_eq!(profile.age_group, AgeGroup::TwelveToTwentyFourMonths);
        assert_eq!(profile.child_name.as_deref(), Some("Sam"));
        assert_eq!(profile.child_age.as_deref(), Some("18 months"));
        assert_eq!(profile.selected_age, None);
    }
}
