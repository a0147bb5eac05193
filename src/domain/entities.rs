//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::domain::{names::symptom_label, types::AgeGroup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_editor: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub dob: Date,
    pub active: bool,
}

/// A symptom. `name` is always stored normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl CategoryRecord {
    pub fn label(&self) -> String {
        symptom_label(&self.name)
    }

    pub fn url(&self) -> String {
        format!("/symptom/{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingRecord {
    pub id: i64,
    pub category_id: i64,
    pub text: String,
}

impl HeadingRecord {
    pub fn url(&self) -> String {
        format!("/symptom/information/{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubHeadingRecord {
    pub id: i64,
    pub heading_id: i64,
    pub title: String,
    pub text: String,
    pub age_groups: Vec<AgeGroup>,
    pub last_edited: OffsetDateTime,
}

impl SubHeadingRecord {
    pub fn is_visible_to(&self, group: AgeGroup) -> bool {
        self.age_groups.contains(&group)
    }

    pub fn age_labels(&self) -> String {
        self.age_groups
            .iter()
            .map(|group| group.label())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn url(&self) -> String {
        format!("/symptom/information/{}#{}", self.heading_id, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiaryLogRecord {
    pub id: i64,
    pub child_id: i64,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub created_on: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_point_at_public_routes() {
        let category = CategoryRecord {
            id: 1,
            name: "high_temperature".into(),
            description: String::new(),
        };
        assert_eq!(category.url(), "/symptom/high_temperature");
        assert_eq!(category.label(), "High Temperature");

        let sub = SubHeadingRecord {
            id: 9,
            heading_id: 4,
            title: "When to call".into(),
            text: String::new(),
            age_groups: vec![AgeGroup::UnderOneMonth, AgeGroup::TwoToFiveYears],
            last_edited: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(sub.url(), "/symptom/information/4#9");
        assert_eq!(sub.age_labels(), "less than 1 month, 2-5 years");
        assert!(sub.is_visible_to(AgeGroup::TwoToFiveYears));
        assert!(!sub.is_visible_to(AgeGroup::OneToThreeMonths));
    }
}
