//! Per-child diary entries.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    application::repos::{
        ChildrenRepo, CreateDiaryLogParams, DiaryRepo, RepoError, UpdateDiaryLogParams,
    },
    domain::{
        entities::{ChildRecord, DiaryLogRecord},
        error::DomainError,
    },
    util::clock::Clock,
};

pub const TITLE_MAX_CHARS: usize = 150;
pub const TEXT_MAX_CHARS: usize = 2400;

pub const ENTRY_REJECTED: &str = "Diary entry not added/edited";

#[derive(Debug, Error)]
pub enum DiaryError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("diary entry or child not found for this account")]
    NotOwned,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct DiaryEntryInput {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
}

impl DiaryEntryInput {
    fn validate(self) -> Result<Self, DomainError> {
        let title = self.title.trim().to_string();
        if title.is_empty() || title.chars().count() > TITLE_MAX_CHARS {
            return Err(DomainError::validation(
                "title",
                format!("title must be 1 to {TITLE_MAX_CHARS} characters"),
            ));
        }
        if self.text.chars().count() > TEXT_MAX_CHARS {
            return Err(DomainError::validation(
                "text",
                format!("entry must be at most {TEXT_MAX_CHARS} characters"),
            ));
        }
        let image = self
            .image
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty());
        Ok(Self {
            title,
            text: self.text,
            image,
        })
    }
}

#[derive(Clone)]
pub struct DiaryService {
    children: Arc<dyn ChildrenRepo>,
    diary: Arc<dyn DiaryRepo>,
    clock: Arc<dyn Clock>,
}

impl DiaryService {
    pub fn new(
        children: Arc<dyn ChildrenRepo>,
        diary: Arc<dyn DiaryRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            children,
            diary,
            clock,
        }
    }

    pub async fn children(&self, user_id: i64) -> Result<Vec<ChildRecord>, RepoError> {
        self.children.list_children(user_id).await
    }

    /// The child and its logs, provided the child belongs to `user_id`.
    pub async fn logs(
        &self,
        user_id: i64,
        child_id: i64,
    ) -> Result<(ChildRecord, Vec<DiaryLogRecord>), DiaryError> {
        let child = self.owned_child(user_id, child_id).await?;
        let logs = self.diary.list_logs(child.id).await?;
        Ok((child, logs))
    }

    /// Create a log when `check_id` is 0, otherwise edit log `check_id`.
    pub async fn save(
        &self,
        user_id: i64,
        child_id: i64,
        check_id: i64,
        input: DiaryEntryInput,
    ) -> Result<DiaryLogRecord, DiaryError> {
        let child = self.owned_child(user_id, child_id).await?;
        let input = input.validate()?;

        if check_id == 0 {
            let log = self
                .diary
                .create_log(CreateDiaryLogParams {
                    child_id: child.id,
                    title: input.title,
                    text: input.text,
                    image: input.image,
                    created_on: self.clock.now(),
                })
                .await?;
            return Ok(log);
        }

        match self.diary.find_log(check_id).await? {
            Some(log) if log.child_id == child.id => self
                .diary
                .update_log(UpdateDiaryLogParams {
                    id: log.id,
                    title: input.title,
                    text: input.text,
                    image: input.image.or(log.image),
                })
                .await?
                .ok_or(DiaryError::NotOwned),
            _ => Err(DiaryError::NotOwned),
        }
    }

    pub async fn delete(&self, user_id: i64, log_id: i64) -> Result<(), DiaryError> {
        let log = self
            .diary
            .find_log(log_id)
            .await?
            .ok_or(DiaryError::NotOwned)?;
        self.owned_child(user_id, log.child_id).await?;
        if self.diary.delete_log(log.id).await? {
            Ok(())
        } else {
            Err(DiaryError::NotOwned)
        }
    }

    async fn owned_child(&self, user_id: i64, child_id: i64) -> Result<ChildRecord, DiaryError> {
        self.children
            .find_child(user_id, child_id)
            .await?
            .ok_or(DiaryError::NotOwned)
    }
}
