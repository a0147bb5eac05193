//! Child profiles of a signed-in parent.

use std::sync::Arc;

use thiserror::Error;
use time::Date;
use tracing::info;

use crate::{
    application::repos::{ChildrenRepo, CreateChildParams, RepoError, UpdateChildParams},
    domain::{
        age::{age_in_months, age_string, validate_child_dob},
        entities::ChildRecord,
        error::DomainError,
    },
    util::clock::Clock,
};

const NAME_MAX_CHARS: usize = 100;

/// Shown whenever a submitted child fails validation.
pub const CHILD_REJECTED: &str = "No child above the age of 5 can be added";

#[derive(Debug, Error)]
pub enum ChildError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("child not found for this account")]
    NotOwned,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ChildError {
    /// Inline message for the child forms.
    pub fn form_message(&self) -> Option<&'static str> {
        match self {
            ChildError::Invalid(_) | ChildError::NotOwned => Some(CHILD_REJECTED),
            ChildError::Repo(_) => None,
        }
    }
}

/// A child together with its display age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSummary {
    pub child: ChildRecord,
    pub age: String,
}

#[derive(Clone)]
pub struct ChildrenService {
    repo: Arc<dyn ChildrenRepo>,
    clock: Arc<dyn Clock>,
}

impl ChildrenService {
    pub fn new(repo: Arc<dyn ChildrenRepo>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<ChildSummary>, RepoError> {
        let today = self.clock.today();
        let children = self.repo.list_children(user_id).await?;
        Ok(children
            .into_iter()
            .map(|child| ChildSummary {
                age: age_string(age_in_months(child.dob, today)),
                child,
            })
            .collect())
    }

    /// Register a child; it becomes the active one.
    pub async fn add(&self, user_id: i64, name: &str, dob: Date) -> Result<ChildRecord, ChildError> {
        let name = self.validate(name, dob)?;
        let child = self
            .repo
            .create_child(CreateChildParams { user_id, name, dob })
            .await?;
        info!(
            target = "asksniff::application::children",
            user_id,
            child_id = child.id,
            "Child added and activated"
        );
        Ok(child)
    }

    pub async fn edit(
        &self,
        user_id: i64,
        child_id: i64,
        name: &str,
        dob: Date,
    ) -> Result<ChildRecord, ChildError> {
        let name = self.validate(name, dob)?;
        self.repo
            .update_child(UpdateChildParams {
                id: child_id,
                user_id,
                name,
                dob,
            })
            .await?
            .ok_or(ChildError::NotOwned)
    }

    pub async fn activate(&self, user_id: i64, child_id: i64) -> Result<(), ChildError> {
        if self.repo.activate_child(user_id, child_id).await? {
            Ok(())
        } else {
            Err(ChildError::NotOwned)
        }
    }

    pub async fn delete(&self, user_id: i64, child_id: i64) -> Result<(), ChildError> {
        if self.repo.delete_child(user_id, child_id).await? {
            info!(
                target = "asksniff::application::children",
                user_id, child_id, "Child deleted"
            );
            Ok(())
        } else {
            Err(ChildError::NotOwned)
        }
    }

    fn validate(&self, name: &str, dob: Date) -> Result<String, DomainError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
            return Err(DomainError::validation(
                "name",
                format!("child name must be 1 to {NAME_MAX_CHARS} characters"),
            ));
        }
        validate_child_dob(dob, self.clock.today())?;
        Ok(name.to_string())
    }
}
