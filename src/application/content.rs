//! Read side of the symptom taxonomy, fronted by the content cache.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::{
    application::repos::{ContentRepo, RepoError},
    cache::{ContentCache, ContentKey},
    domain::{
        entities::{CategoryRecord, HeadingRecord, SubHeadingRecord},
        names::{normalize_symptom_name, symptom_label},
        types::AgeGroup,
    },
};

/// One search result as returned to the browser. Ids travel as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub text: String,
    pub heading_id: String,
    pub sub_heading_id: String,
}

impl From<&SubHeadingRecord> for SearchHit {
    fn from(record: &SubHeadingRecord) -> Self {
        Self {
            title: record.title.clone(),
            text: record.text.clone(),
            heading_id: record.heading_id.to_string(),
            sub_heading_id: record.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Empty,
    Found(Vec<SearchHit>),
}

/// `{"status":1,"data":[...]}` or `{"status":0}`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<SearchHit>>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Empty => Self {
                status: 0,
                data: None,
            },
            SearchOutcome::Found(hits) => Self {
                status: 1,
                data: Some(hits),
            },
        }
    }
}

/// An entry of the editor link index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct SymptomView {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub headings: Vec<HeadingRecord>,
}

#[derive(Debug, Clone)]
pub struct HeadingView {
    pub heading: HeadingRecord,
    pub sub_headings: Vec<SubHeadingRecord>,
}

#[derive(Clone)]
pub struct ContentService {
    repo: Arc<dyn ContentRepo>,
    cache: Arc<ContentCache>,
}

impl ContentService {
    pub fn new(repo: Arc<dyn ContentRepo>, cache: Arc<ContentCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list_symptoms(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.repo.list_categories().await
    }

    /// Headings and description of a symptom. Unknown symptoms yield an empty
    /// view rather than an error.
    #[instrument(skip(self))]
    pub async fn symptom(&self, raw_name: &str) -> Result<SymptomView, RepoError> {
        let name = normalize_symptom_name(raw_name);

        let description: Option<String> = self
            .cache
            .get_or_compute(ContentKey::SymptomDescription(name.clone()), || async {
                let category = self.repo.find_category_by_name(&name).await?;
                Ok::<_, RepoError>(category.map(|category| category.description))
            })
            .await?;

        let headings: Vec<HeadingRecord> = self
            .cache
            .get_or_compute(ContentKey::Symptom(name.clone()), || {
                self.repo.list_headings_for_symptom(&name)
            })
            .await?;

        Ok(SymptomView {
            label: symptom_label(&name),
            name,
            description,
            headings,
        })
    }

    /// A heading with the sub-headings visible to `age_group`, or `None` when
    /// the heading does not exist.
    #[instrument(skip(self))]
    pub async fn heading(
        &self,
        heading_id: i64,
        age_group: AgeGroup,
    ) -> Result<Option<HeadingView>, RepoError> {
        let Some(heading) = self.repo.find_heading(heading_id).await? else {
            return Ok(None);
        };

        let sub_headings: Vec<SubHeadingRecord> = self
            .cache
            .get_or_compute(
                ContentKey::Heading {
                    heading_id,
                    age_group,
                },
                || self.repo.list_visible_sub_headings(heading_id, age_group),
            )
            .await?;

        Ok(Some(HeadingView {
            heading,
            sub_headings,
        }))
    }

    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        age_group: AgeGroup,
    ) -> Result<SearchOutcome, RepoError> {
        if query.trim().is_empty() {
            return Ok(SearchOutcome::Empty);
        }

        let hits: Vec<SearchHit> = self
            .cache
            .get_or_compute(ContentKey::search(query, age_group), || async {
                let records = self.repo.search_sub_headings(query, age_group).await?;
                Ok::<_, RepoError>(records.iter().map(SearchHit::from).collect())
            })
            .await?;

        if hits.is_empty() {
            Ok(SearchOutcome::Empty)
        } else {
            Ok(SearchOutcome::Found(hits))
        }
    }

    /// Every symptom, heading and sub-heading with its public URL.
    pub async fn all_urls(&self) -> Result<Vec<LinkEntry>, RepoError> {
        self.cache
            .get_or_compute(ContentKey::AllUrls, || async {
                let categories = self.repo.list_categories().await?;
                let headings = self.repo.list_all_headings().await?;
                let sub_headings = self.repo.list_all_sub_headings().await?;

                let mut links =
                    Vec::with_capacity(categories.len() + headings.len() + sub_headings.len());
                links.extend(categories.iter().map(|category| LinkEntry {
                    name: format!("Symptom: {}", category.label()),
                    url: category.url(),
                }));
                links.extend(headings.iter().map(|heading| LinkEntry {
                    name: format!("Heading: {}", heading.text),
                    url: heading.url(),
                }));
                links.extend(sub_headings.iter().map(|sub| LinkEntry {
                    name: format!("Sub Heading: {} ({})", sub.title, sub.age_labels()),
                    url: sub.url(),
                }));
                Ok(links)
            })
            .await
    }
}
