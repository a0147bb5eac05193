//! Editor CRUD over symptoms, headings and sub-headings.
//!
//! Rich text coming from the editor screens is sanitized before it is stored,
//! so templates can render it unescaped.

use std::{collections::HashSet, sync::Arc};

use ammonia::Builder as AmmoniaBuilder;
use thiserror::Error;
use tracing::info;

use crate::{
    application::repos::{
        CategoryParams, ContentRepo, ContentWriteRepo, RepoError, SubHeadingParams,
    },
    domain::{
        entities::{CategoryRecord, HeadingRecord, SubHeadingRecord},
        error::DomainError,
        names::normalize_symptom_name,
        types::AgeGroup,
    },
    util::clock::Clock,
};

const NAME_MAX_CHARS: usize = 150;
const HEADING_MAX_CHARS: usize = 500;
const TITLE_MAX_CHARS: usize = 150;

#[derive(Debug, Error)]
pub enum AdminContentError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("a symptom named `{0}` already exists")]
    DuplicateSymptom(String),
    #[error("referenced content no longer exists")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AdminContentError {
    pub fn form_message(&self) -> Option<String> {
        match self {
            AdminContentError::Invalid(DomainError::Validation { message, .. }) => {
                Some(message.clone())
            }
            AdminContentError::Invalid(other) => Some(other.to_string()),
            AdminContentError::DuplicateSymptom(_) => Some(self.to_string()),
            AdminContentError::NotFound | AdminContentError::Repo(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymptomInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct SubHeadingInput {
    pub heading_id: i64,
    pub title: String,
    pub text: String,
    pub age_groups: Vec<AgeGroup>,
}

/// A symptom with every heading and each heading's sub-headings.
#[derive(Debug, Clone)]
pub struct SymptomDetail {
    pub category: CategoryRecord,
    pub headings: Vec<(HeadingRecord, Vec<SubHeadingRecord>)>,
}

#[derive(Clone)]
pub struct AdminContentService {
    read: Arc<dyn ContentRepo>,
    write: Arc<dyn ContentWriteRepo>,
    clock: Arc<dyn Clock>,
    sanitizer: Arc<AmmoniaBuilder<'static>>,
}

impl AdminContentService {
    pub fn new(
        read: Arc<dyn ContentRepo>,
        write: Arc<dyn ContentWriteRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            read,
            write,
            clock,
            sanitizer: Arc::new(build_rich_text_sanitizer()),
        }
    }

    pub async fn list_symptoms(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.read.list_categories().await
    }

    pub async fn list_headings(&self) -> Result<Vec<HeadingRecord>, RepoError> {
        self.read.list_all_headings().await
    }

    /// Create a symptom, or update symptom `id` when given.
    pub async fn save_symptom(
        &self,
        id: Option<i64>,
        input: SymptomInput,
    ) -> Result<CategoryRecord, AdminContentError> {
        let name = normalize_symptom_name(&input.name);
        if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
            return Err(DomainError::validation(
                "name",
                format!("symptom name must be 1 to {NAME_MAX_CHARS} characters"),
            )
            .into());
        }
        let params = CategoryParams {
            name: name.clone(),
            description: self.sanitize(&input.description),
        };

        let result = match id {
            Some(id) => self.write.update_category(id, params).await,
            None => self.write.create_category(params).await.map(Some),
        };
        let category = match result {
            Ok(Some(category)) => category,
            Ok(None) => return Err(AdminContentError::NotFound),
            Err(RepoError::Duplicate { .. }) => {
                return Err(AdminContentError::DuplicateSymptom(name));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "asksniff::application::admin",
            category_id = category.id,
            name = %category.name,
            "Symptom saved"
        );
        Ok(category)
    }

    pub async fn delete_symptom(&self, id: i64) -> Result<bool, RepoError> {
        let deleted = self.write.delete_category(id).await?;
        if deleted {
            info!(
                target = "asksniff::application::admin",
                category_id = id,
                "Symptom deleted"
            );
        }
        Ok(deleted)
    }

    /// Look a symptom up by name, falling back to a numeric id.
    pub async fn symptom_detail(&self, key: &str) -> Result<Option<SymptomDetail>, RepoError> {
        let mut category = self
            .read
            .find_category_by_name(&normalize_symptom_name(key))
            .await?;
        if category.is_none() {
            if let Ok(id) = key.trim().parse::<i64>() {
                category = self.read.find_category(id).await?;
            }
        }
        let Some(category) = category else {
            return Ok(None);
        };

        let headings = self.read.list_headings(category.id).await?;
        let mut detail = Vec::with_capacity(headings.len());
        for heading in headings {
            let sub_headings = self.read.list_sub_headings(heading.id).await?;
            detail.push((heading, sub_headings));
        }
        Ok(Some(SymptomDetail {
            category,
            headings: detail,
        }))
    }

    pub async fn find_heading(&self, id: i64) -> Result<Option<HeadingRecord>, RepoError> {
        self.read.find_heading(id).await
    }

    pub async fn find_sub_heading(&self, id: i64) -> Result<Option<SubHeadingRecord>, RepoError> {
        self.read.find_sub_heading(id).await
    }

    /// Create a heading when `id` is 0, otherwise edit heading `id`. Returns
    /// the owning symptom so callers can go back to it.
    pub async fn save_heading(
        &self,
        id: i64,
        category_id: i64,
        text: &str,
    ) -> Result<CategoryRecord, AdminContentError> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > HEADING_MAX_CHARS {
            return Err(DomainError::validation(
                "text",
                format!("heading must be 1 to {HEADING_MAX_CHARS} characters"),
            )
            .into());
        }
        let category = self
            .read
            .find_category(category_id)
            .await?
            .ok_or(AdminContentError::NotFound)?;

        let heading = if id == 0 {
            self.write.create_heading(category.id, text).await?
        } else {
            let existing = self
                .read
                .find_heading(id)
                .await?
                .ok_or(AdminContentError::NotFound)?;
            if existing.category_id != category.id {
                return Err(DomainError::validation(
                    "category_id",
                    "a heading cannot move to another symptom",
                )
                .into());
            }
            self.write
                .update_heading(id, text)
                .await?
                .ok_or(AdminContentError::NotFound)?
        };

        info!(
            target = "asksniff::application::admin",
            heading_id = heading.id,
            category_id = category.id,
            "Heading saved"
        );
        Ok(category)
    }

    /// Delete a heading and its sub-headings, returning the owning symptom.
    pub async fn delete_heading(&self, id: i64) -> Result<CategoryRecord, AdminContentError> {
        let heading = self
            .read
            .find_heading(id)
            .await?
            .ok_or(AdminContentError::NotFound)?;
        let category = self.owning_category(&heading).await?;
        if !self.write.delete_heading(id).await? {
            return Err(AdminContentError::NotFound);
        }
        info!(
            target = "asksniff::application::admin",
            heading_id = id,
            "Heading deleted"
        );
        Ok(category)
    }

    /// Create a sub-heading when `id` is 0, otherwise edit sub-heading `id`.
    pub async fn save_sub_heading(
        &self,
        id: i64,
        input: SubHeadingInput,
    ) -> Result<CategoryRecord, AdminContentError> {
        let title = input.title.trim().to_string();
        if title.is_empty() || title.chars().count() > TITLE_MAX_CHARS {
            return Err(DomainError::validation(
                "title",
                format!("title must be 1 to {TITLE_MAX_CHARS} characters"),
            )
            .into());
        }
        let mut age_groups = input.age_groups;
        age_groups.sort();
        age_groups.dedup();
        if age_groups.is_empty() {
            return Err(
                DomainError::validation("age_groups", "select at least one age group").into(),
            );
        }

        let heading = self
            .read
            .find_heading(input.heading_id)
            .await?
            .ok_or(AdminContentError::NotFound)?;
        let params = SubHeadingParams {
            heading_id: heading.id,
            title,
            text: self.sanitize(&input.text),
            age_groups,
            edited_at: self.clock.now(),
        };

        let sub_heading = if id == 0 {
            self.write.create_sub_heading(params).await?
        } else {
            self.write
                .update_sub_heading(id, params)
                .await?
                .ok_or(AdminContentError::NotFound)?
        };

        info!(
            target = "asksniff::application::admin",
            sub_heading_id = sub_heading.id,
            heading_id = heading.id,
            "Sub-heading saved"
        );
        self.owning_category(&heading).await
    }

    pub async fn delete_sub_heading(&self, id: i64) -> Result<CategoryRecord, AdminContentError> {
        let sub_heading = self
            .read
            .find_sub_heading(id)
            .await?
            .ok_or(AdminContentError::NotFound)?;
        let heading = self
            .read
            .find_heading(sub_heading.heading_id)
            .await?
            .ok_or(AdminContentError::NotFound)?;
        let category = self.owning_category(&heading).await?;
        if !self.write.delete_sub_heading(id).await? {
            return Err(AdminContentError::NotFound);
        }
        info!(
            target = "asksniff::application::admin",
            sub_heading_id = id,
            "Sub-heading deleted"
        );
        Ok(category)
    }

    async fn owning_category(
        &self,
        heading: &HeadingRecord,
    ) -> Result<CategoryRecord, AdminContentError> {
        self.read
            .find_category(heading.category_id)
            .await?
            .ok_or(AdminContentError::NotFound)
    }

    fn sanitize(&self, html: &str) -> String {
        self.sanitizer.clean(html).to_string()
    }
}

fn build_rich_text_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "em",
        "h2",
        "h3",
        "h4",
        "hr",
        "i",
        "img",
        "li",
        "ol",
        "p",
        "span",
        "strong",
        "u",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);
    builder.generic_attributes(HashSet::from(["class", "id", "title"]));
    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["alt", "width", "height"]);
    builder
}
