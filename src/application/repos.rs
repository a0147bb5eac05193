//! Repository traits describing persistence adapters.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::{Date, OffsetDateTime};

use crate::domain::entities::{
    CategoryRecord, ChildRecord, DiaryLogRecord, HeadingRecord, SubHeadingRecord, UserRecord,
};
use crate::domain::types::AgeGroup;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// Fails with [`RepoError::Duplicate`] when the username is taken.
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;
    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;
    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), RepoError>;
    /// Returns `false` when no user has that username.
    async fn set_editor(&self, username: &str, is_editor: bool) -> Result<bool, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateChildParams {
    pub user_id: i64,
    pub name: String,
    pub dob: Date,
}

#[derive(Debug, Clone)]
pub struct UpdateChildParams {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub dob: Date,
}

/// Child profiles. Every operation is scoped to the owning user, and at most
/// one child per user is active after any call returns.
#[async_trait]
pub trait ChildrenRepo: Send + Sync {
    /// Children of a user, youngest first.
    async fn list_children(&self, user_id: i64) -> Result<Vec<ChildRecord>, RepoError>;
    async fn find_child(&self, user_id: i64, child_id: i64)
    -> Result<Option<ChildRecord>, RepoError>;
    async fn active_child(&self, user_id: i64) -> Result<Option<ChildRecord>, RepoError>;
    /// Insert a child and make it the user's only active child.
    async fn create_child(&self, params: CreateChildParams) -> Result<ChildRecord, RepoError>;
    /// Returns `None` when the child does not belong to the user.
    async fn update_child(&self, params: UpdateChildParams)
    -> Result<Option<ChildRecord>, RepoError>;
    /// Swap the active child. Returns `false` when the child does not belong
    /// to the user, in which case nothing changes.
    async fn activate_child(&self, user_id: i64, child_id: i64) -> Result<bool, RepoError>;
    /// Delete a child. When it was active, the first remaining child in
    /// listing order becomes active.
    async fn delete_child(&self, user_id: i64, child_id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Symptoms ordered by name.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;
    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError>;
    async fn find_category_by_name(&self, name: &str)
    -> Result<Option<CategoryRecord>, RepoError>;
    async fn list_headings(&self, category_id: i64) -> Result<Vec<HeadingRecord>, RepoError>;
    async fn list_headings_for_symptom(&self, name: &str)
    -> Result<Vec<HeadingRecord>, RepoError>;
    async fn list_all_headings(&self) -> Result<Vec<HeadingRecord>, RepoError>;
    async fn find_heading(&self, id: i64) -> Result<Option<HeadingRecord>, RepoError>;
    /// Every sub-heading of a heading, regardless of age group.
    async fn list_sub_headings(&self, heading_id: i64)
    -> Result<Vec<SubHeadingRecord>, RepoError>;
    async fn list_visible_sub_headings(
        &self,
        heading_id: i64,
        age_group: AgeGroup,
    ) -> Result<Vec<SubHeadingRecord>, RepoError>;
    async fn list_all_sub_headings(&self) -> Result<Vec<SubHeadingRecord>, RepoError>;
    async fn find_sub_heading(&self, id: i64) -> Result<Option<SubHeadingRecord>, RepoError>;
    /// Distinct sub-headings visible to `age_group` whose heading text,
    /// symptom description, symptom name, title or text contains `query`
    /// case-insensitively.
    async fn search_sub_headings(
        &self,
        query: &str,
        age_group: AgeGroup,
    ) -> Result<Vec<SubHeadingRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CategoryParams {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct SubHeadingParams {
    pub heading_id: i64,
    pub title: String,
    pub text: String,
    pub age_groups: Vec<AgeGroup>,
    pub edited_at: OffsetDateTime,
}

/// Editor writes. Deletes cascade to owned rows.
#[async_trait]
pub trait ContentWriteRepo: Send + Sync {
    async fn create_category(&self, params: CategoryParams) -> Result<CategoryRecord, RepoError>;
    async fn update_category(
        &self,
        id: i64,
        params: CategoryParams,
    ) -> Result<Option<CategoryRecord>, RepoError>;
    async fn delete_category(&self, id: i64) -> Result<bool, RepoError>;
    async fn create_heading(&self, category_id: i64, text: &str)
    -> Result<HeadingRecord, RepoError>;
    async fn update_heading(&self, id: i64, text: &str)
    -> Result<Option<HeadingRecord>, RepoError>;
    async fn delete_heading(&self, id: i64) -> Result<bool, RepoError>;
    async fn create_sub_heading(
        &self,
        params: SubHeadingParams,
    ) -> Result<SubHeadingRecord, RepoError>;
    async fn update_sub_heading(
        &self,
        id: i64,
        params: SubHeadingParams,
    ) -> Result<Option<SubHeadingRecord>, RepoError>;
    async fn delete_sub_heading(&self, id: i64) -> Result<bool, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateDiaryLogParams {
    pub child_id: i64,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub created_on: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateDiaryLogParams {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
}

#[async_trait]
pub trait DiaryRepo: Send + Sync {
    /// Logs of a child in creation order.
    async fn list_logs(&self, child_id: i64) -> Result<Vec<DiaryLogRecord>, RepoError>;
    async fn find_log(&self, id: i64) -> Result<Option<DiaryLogRecord>, RepoError>;
    async fn create_log(&self, params: CreateDiaryLogParams) -> Result<DiaryLogRecord, RepoError>;
    async fn update_log(
        &self,
        params: UpdateDiaryLogParams,
    ) -> Result<Option<DiaryLogRecord>, RepoError>;
    async fn delete_log(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

/// One storage backend seen through every repository trait.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepo>,
    pub children: Arc<dyn ChildrenRepo>,
    pub content: Arc<dyn ContentRepo>,
    pub content_write: Arc<dyn ContentWriteRepo>,
    pub diary: Arc<dyn DiaryRepo>,
    pub health: Arc<dyn HealthRepo>,
}

impl Repositories {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UsersRepo
            + ChildrenRepo
            + ContentRepo
            + ContentWriteRepo
            + DiaryRepo
            + HealthRepo
            + 'static,
    {
        Self {
            users: backend.clone(),
            children: backend.clone(),
            content: backend.clone(),
            content_write: backend.clone(),
            diary: backend.clone(),
            health: backend,
        }
    }
}
