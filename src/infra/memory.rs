//! In-memory repository backend.
//!
//! Backs the integration tests and database-less runs. Every trait method
//! takes the single state lock once, so multi-row changes (activating a
//! child, cascading deletes) are atomic with respect to other requests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    application::repos::{
        CategoryParams, ChildrenRepo, ContentRepo, ContentWriteRepo, CreateChildParams,
        CreateDiaryLogParams, CreateUserParams, DiaryRepo, HealthRepo, RepoError,
        SubHeadingParams, UpdateChildParams, UpdateDiaryLogParams, UsersRepo,
    },
    domain::{
        entities::{
            CategoryRecord, ChildRecord, DiaryLogRecord, HeadingRecord, SubHeadingRecord,
            UserRecord,
        },
        types::AgeGroup,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    users: Vec<UserRecord>,
    children: Vec<ChildRecord>,
    categories: Vec<CategoryRecord>,
    headings: Vec<HeadingRecord>,
    sub_headings: Vec<SubHeadingRecord>,
    logs: Vec<DiaryLogRecord>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn children_of(&self, user_id: i64) -> Vec<ChildRecord> {
        let mut children: Vec<ChildRecord> = self
            .children
            .iter()
            .filter(|child| child.user_id == user_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| b.dob.cmp(&a.dob).then(a.id.cmp(&b.id)));
        children
    }

    fn set_active(&mut self, user_id: i64, child_id: i64) {
        for child in self.children.iter_mut().filter(|c| c.user_id == user_id) {
            child.active = child.id == child_id;
        }
    }

    fn category(&self, id: i64) -> Option<&CategoryRecord> {
        self.categories.iter().find(|category| category.id == id)
    }

    fn heading(&self, id: i64) -> Option<&HeadingRecord> {
        self.headings.iter().find(|heading| heading.id == id)
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.categories
            .iter()
            .any(|category| category.name == name && Some(category.id) != except)
    }

    fn drop_heading_tree(&mut self, heading_ids: &[i64]) {
        self.sub_headings
            .retain(|sub| !heading_ids.contains(&sub.heading_id));
        self.headings
            .retain(|heading| !heading_ids.contains(&heading.id));
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepositories {
    state: RwLock<MemoryState>,
    content_reads: AtomicUsize,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of content read queries served so far.
    pub fn content_reads(&self) -> usize {
        self.content_reads.load(Ordering::Relaxed)
    }

    fn count_read(&self) {
        self.content_reads.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            is_editor: false,
            created_at: params.created_at,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_editor(&self, username: &str, is_editor: bool) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        match state.users.iter_mut().find(|user| user.username == username) {
            Some(user) => {
                user.is_editor = is_editor;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ChildrenRepo for MemoryRepositories {
    async fn list_children(&self, user_id: i64) -> Result<Vec<ChildRecord>, RepoError> {
        Ok(self.state.read().await.children_of(user_id))
    }

    async fn find_child(
        &self,
        user_id: i64,
        child_id: i64,
    ) -> Result<Option<ChildRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .children
            .iter()
            .find(|child| child.id == child_id && child.user_id == user_id)
            .cloned())
    }

    async fn active_child(&self, user_id: i64) -> Result<Option<ChildRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .children
            .iter()
            .find(|child| child.user_id == user_id && child.active)
            .cloned())
    }

    async fn create_child(&self, params: CreateChildParams) -> Result<ChildRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|user| user.id == params.user_id) {
            return Err(RepoError::Integrity {
                message: format!("user {} does not exist", params.user_id),
            });
        }
        let id = state.next_id();
        state.children.push(ChildRecord {
            id,
            user_id: params.user_id,
            name: params.name,
            dob: params.dob,
            active: true,
        });
        state.set_active(params.user_id, id);
        state
            .children
            .iter()
            .find(|child| child.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update_child(
        &self,
        params: UpdateChildParams,
    ) -> Result<Option<ChildRecord>, RepoError> {
        let mut state = self.state.write().await;
        let Some(child) = state
            .children
            .iter_mut()
            .find(|child| child.id == params.id && child.user_id == params.user_id)
        else {
            return Ok(None);
        };
        child.name = params.name;
        child.dob = params.dob;
        Ok(Some(child.clone()))
    }

    async fn activate_child(&self, user_id: i64, child_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let owned = state
            .children
            .iter()
            .any(|child| child.id == child_id && child.user_id == user_id);
        if owned {
            state.set_active(user_id, child_id);
        }
        Ok(owned)
    }

    async fn delete_child(&self, user_id: i64, child_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let Some(position) = state
            .children
            .iter()
            .position(|child| child.id == child_id && child.user_id == user_id)
        else {
            return Ok(false);
        };
        let removed = state.children.remove(position);
        state.logs.retain(|log| log.child_id != child_id);

        if removed.active {
            if let Some(next) = state.children_of(user_id).first() {
                let next_id = next.id;
                state.set_active(user_id, next_id);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ContentRepo for MemoryRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.count_read();
        let mut categories = self.state.read().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        self.count_read();
        Ok(self.state.read().await.category(id).cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        self.count_read();
        let state = self.state.read().await;
        Ok(state
            .categories
            .iter()
            .find(|category| category.name == name)
            .cloned())
    }

    async fn list_headings(&self, category_id: i64) -> Result<Vec<HeadingRecord>, RepoError> {
        self.count_read();
        let state = self.state.read().await;
        let mut headings: Vec<HeadingRecord> = state
            .headings
            .iter()
            .filter(|heading| heading.category_id == category_id)
            .cloned()
            .collect();
        headings.sort_by_key(|heading| heading.id);
        Ok(headings)
    }

    async fn list_headings_for_symptom(
        &self,
        name: &str,
    ) -> Result<Vec<HeadingRecord>, RepoError> {
        self.count_read();
        let state = self.state.read().await;
        let Some(category_id) = state
            .categories
            .iter()
            .find(|category| category.name == name)
            .map(|category| category.id)
        else {
            return Ok(Vec::new());
        };
        let mut headings: Vec<HeadingRecord> = state
            .headings
            .iter()
            .filter(|heading| heading.category_id == category_id)
            .cloned()
            .collect();
        headings.sort_by_key(|heading| heading.id);
        Ok(headings)
    }

    async fn list_all_headings(&self) -> Result<Vec<HeadingRecord>, RepoError> {
        self.count_read();
        let mut headings = self.state.read().await.headings.clone();
        headings.sort_by_key(|heading| heading.id);
        Ok(headings)
    }

    async fn find_heading(&self, id: i64) -> Result<Option<HeadingRecord>, RepoError> {
        self.count_read();
        Ok(self.state.read().await.heading(id).cloned())
    }

    async fn list_sub_headings(
        &self,
        heading_id: i64,
    ) -> Result<Vec<SubHeadingRecord>, RepoError> {
        self.count_read();
        let state = self.state.read().await;
        let mut subs: Vec<SubHeadingRecord> = state
            .sub_headings
            .iter()
            .filter(|sub| sub.heading_id == heading_id)
            .cloned()
            .collect();
        subs.sort_by_key(|sub| sub.id);
        Ok(subs)
    }

    async fn list_visible_sub_headings(
        &self,
        heading_id: i64,
        age_group: AgeGroup,
    ) -> Result<Vec<SubHeadingRecord>, RepoError> {
        self.count_read();
        let state = self.state.read().await;
        let mut subs: Vec<SubHeadingRecord> = state
            .sub_headings
            .iter()
            .filter(|sub| sub.heading_id == heading_id && sub.is_visible_to(age_group))
            .cloned()
            .collect();
        subs.sort_by_key(|sub| sub.id);
        Ok(subs)
    }

    async fn list_all_sub_headings(&self) -> Result<Vec<SubHeadingRecord>, RepoError> {
        self.count_read();
        let mut subs = self.state.read().await.sub_headings.clone();
        subs.sort_by_key(|sub| sub.id);
        Ok(subs)
    }

    async fn find_sub_heading(&self, id: i64) -> Result<Option<SubHeadingRecord>, RepoError> {
        self.count_read();
        let state = self.state.read().await;
        Ok(state.sub_headings.iter().find(|sub| sub.id == id).cloned())
    }

    async fn search_sub_headings(
        &self,
        query: &str,
        age_group: AgeGroup,
    ) -> Result<Vec<SubHeadingRecord>, RepoError> {
        self.count_read();
        let needle = query.to_lowercase();
        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

        let state = self.state.read().await;
        let mut hits: Vec<SubHeadingRecord> = state
            .sub_headings
            .iter()
            .filter(|sub| sub.is_visible_to(age_group))
            .filter(|sub| {
                let heading = state.heading(sub.heading_id);
                let category = heading.and_then(|heading| state.category(heading.category_id));
                contains(&sub.title)
                    || contains(&sub.text)
                    || heading.is_some_and(|heading| contains(&heading.text))
                    || category.is_some_and(|category| {
                        contains(&category.name) || contains(&category.description)
                    })
            })
            .cloned()
            .collect();
        hits.sort_by_key(|sub| sub.id);
        Ok(hits)
    }
}

#[async_trait]
impl ContentWriteRepo for MemoryRepositories {
    async fn create_category(&self, params: CategoryParams) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.name_taken(&params.name, None) {
            return Err(RepoError::Duplicate {
                constraint: "categories_name_key".to_string(),
            });
        }
        let category = CategoryRecord {
            id: state.next_id(),
            name: params.name,
            description: params.description,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i64,
        params: CategoryParams,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let mut state = self.state.write().await;
        if state.name_taken(&params.name, Some(id)) {
            return Err(RepoError::Duplicate {
                constraint: "categories_name_key".to_string(),
            });
        }
        let Some(category) = state.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.name = params.name;
        category.description = params.description;
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.categories.len();
        state.categories.retain(|category| category.id != id);
        if state.categories.len() == before {
            return Ok(false);
        }
        let heading_ids: Vec<i64> = state
            .headings
            .iter()
            .filter(|heading| heading.category_id == id)
            .map(|heading| heading.id)
            .collect();
        state.drop_heading_tree(&heading_ids);
        Ok(true)
    }

    async fn create_heading(
        &self,
        category_id: i64,
        text: &str,
    ) -> Result<HeadingRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.category(category_id).is_none() {
            return Err(RepoError::Integrity {
                message: format!("category {category_id} does not exist"),
            });
        }
        let heading = HeadingRecord {
            id: state.next_id(),
            category_id,
            text: text.to_string(),
        };
        state.headings.push(heading.clone());
        Ok(heading)
    }

    async fn update_heading(
        &self,
        id: i64,
        text: &str,
    ) -> Result<Option<HeadingRecord>, RepoError> {
        let mut state = self.state.write().await;
        let Some(heading) = state.headings.iter_mut().find(|h| h.id == id) else {
            return Ok(None);
        };
        heading.text = text.to_string();
        Ok(Some(heading.clone()))
    }

    async fn delete_heading(&self, id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if state.heading(id).is_none() {
            return Ok(false);
        }
        state.drop_heading_tree(&[id]);
        Ok(true)
    }

    async fn create_sub_heading(
        &self,
        params: SubHeadingParams,
    ) -> Result<SubHeadingRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.heading(params.heading_id).is_none() {
            return Err(RepoError::Integrity {
                message: format!("heading {} does not exist", params.heading_id),
            });
        }
        let sub = SubHeadingRecord {
            id: state.next_id(),
            heading_id: params.heading_id,
            title: params.title,
            text: params.text,
            age_groups: params.age_groups,
            last_edited: params.edited_at,
        };
        state.sub_headings.push(sub.clone());
        Ok(sub)
    }

    async fn update_sub_heading(
        &self,
        id: i64,
        params: SubHeadingParams,
    ) -> Result<Option<SubHeadingRecord>, RepoError> {
        let mut state = self.state.write().await;
        if state.heading(params.heading_id).is_none() {
            return Err(RepoError::Integrity {
                message: format!("heading {} does not exist", params.heading_id),
            });
        }
        let Some(sub) = state.sub_headings.iter_mut().find(|sub| sub.id == id) else {
            return Ok(None);
        };
        sub.heading_id = params.heading_id;
        sub.title = params.title;
        sub.text = params.text;
        sub.age_groups = params.age_groups;
        sub.last_edited = params.edited_at;
        Ok(Some(sub.clone()))
    }

    async fn delete_sub_heading(&self, id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.sub_headings.len();
        state.sub_headings.retain(|sub| sub.id != id);
        Ok(state.sub_headings.len() != before)
    }
}

#[async_trait]
impl DiaryRepo for MemoryRepositories {
    async fn list_logs(&self, child_id: i64) -> Result<Vec<DiaryLogRecord>, RepoError> {
        let state = self.state.read().await;
        let mut logs: Vec<DiaryLogRecord> = state
            .logs
            .iter()
            .filter(|log| log.child_id == child_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| a.created_on.cmp(&b.created_on).then(a.id.cmp(&b.id)));
        Ok(logs)
    }

    async fn find_log(&self, id: i64) -> Result<Option<DiaryLogRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.logs.iter().find(|log| log.id == id).cloned())
    }

    async fn create_log(&self, params: CreateDiaryLogParams) -> Result<DiaryLogRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.children.iter().any(|child| child.id == params.child_id) {
            return Err(RepoError::Integrity {
                message: format!("child {} does not exist", params.child_id),
            });
        }
        let log = DiaryLogRecord {
            id: state.next_id(),
            child_id: params.child_id,
            title: params.title,
            text: params.text,
            image: params.image,
            created_on: params.created_on,
        };
        state.logs.push(log.clone());
        Ok(log)
    }

    async fn update_log(
        &self,
        params: UpdateDiaryLogParams,
    ) -> Result<Option<DiaryLogRecord>, RepoError> {
        let mut state = self.state.write().await;
        let Some(log) = state.logs.iter_mut().find(|log| log.id == params.id) else {
            return Ok(None);
        };
        log.title = params.title;
        log.text = params.text;
        log.image = params.image;
        Ok(Some(log.clone()))
    }

    async fn delete_log(&self, id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.logs.len();
        state.logs.retain(|log| log.id != id);
        Ok(state.logs.len() != before)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::date};

    use super::*;

    async fn user(repo: &MemoryRepositories, username: &str) -> UserRecord {
        repo.create_user(CreateUserParams {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        })
        .await
        .expect("user")
    }

    async fn child(repo: &MemoryRepositories, user_id: i64, name: &str, dob: time::Date) -> i64 {
        repo.create_child(CreateChildParams {
            user_id,
            name: name.to_string(),
            dob,
        })
        .await
        .expect("child")
        .id
    }

    fn active_ids(children: &[ChildRecord]) -> Vec<i64> {
        children
            .iter()
            .filter(|child| child.active)
            .map(|child| child.id)
            .collect()
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let repo = MemoryRepositories::new();
        user(&repo, "parent").await;
        let err = repo
            .create_user(CreateUserParams {
                username: "parent".to_string(),
                email: "other@example.com".to_string(),
                password_hash: "hash".to_string(),
                created_at: OffsetDateTime::UNIX_EPOCH,
            })
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn one_active_child_through_create_activate_and_delete() {
        let repo = MemoryRepositories::new();
        let parent = user(&repo, "parent").await;
        let other = user(&repo, "other").await;

        let older = child(&repo, parent.id, "Ada", date!(2021 - 01 - 10)).await;
        let younger = child(&repo, parent.id, "Bo", date!(2023 - 06 - 01)).await;
        let foreign = child(&repo, other.id, "Cy", date!(2022 - 02 - 02)).await;

        let listed = repo.list_children(parent.id).await.expect("list");
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![younger, older]
        );
        assert_eq!(active_ids(&listed), vec![younger]);

        assert!(repo.activate_child(parent.id, older).await.expect("activate"));
        assert!(!repo.activate_child(parent.id, foreign).await.expect("activate"));
        let listed = repo.list_children(parent.id).await.expect("list");
        assert_eq!(active_ids(&listed), vec![older]);

        assert!(repo.delete_child(parent.id, older).await.expect("delete"));
        let active = repo.active_child(parent.id).await.expect("active");
        assert_eq!(active.map(|c| c.id), Some(younger));

        assert!(!repo.delete_child(parent.id, foreign).await.expect("delete"));
        let others = repo.list_children(other.id).await.expect("list");
        assert_eq!(active_ids(&others), vec![foreign]);
    }

    #[tokio::test]
    async fn deleting_a_symptom_cascades() {
        let repo = MemoryRepositories::new();
        let category = repo
            .create_category(CategoryParams {
                name: "rash".to_string(),
                description: String::new(),
            })
            .await
            .expect("category");
        let heading = repo
            .create_heading(category.id, "Causes")
            .await
            .expect("heading");
        repo.create_sub_heading(SubHeadingParams {
            heading_id: heading.id,
            title: "Heat".to_string(),
            text: "Too warm".to_string(),
            age_groups: vec![AgeGroup::UnderOneMonth],
            edited_at: OffsetDateTime::UNIX_EPOCH,
        })
        .await
        .expect("sub-heading");

        assert!(repo.delete_category(category.id).await.expect("delete"));
        assert!(repo.list_all_headings().await.expect("headings").is_empty());
        assert!(repo.list_all_sub_headings().await.expect("subs").is_empty());
    }

    #[tokio::test]
    async fn search_matches_any_field_once_and_respects_age() {
        let repo = MemoryRepositories::new();
        let category = repo
            .create_category(CategoryParams {
                name: "high_temperature".to_string(),
                description: "Fever in babies".to_string(),
            })
            .await
            .expect("category");
        let heading = repo
            .create_heading(category.id, "Fever basics")
            .await
            .expect("heading");
        let sub = repo
            .create_sub_heading(SubHeadingParams {
                heading_id: heading.id,
                title: "Fever checks".to_string(),
                text: "Measure the fever".to_string(),
                age_groups: vec![AgeGroup::OneToThreeMonths],
                edited_at: OffsetDateTime::UNIX_EPOCH,
            })
            .await
            .expect("sub-heading");

        let hits = repo
            .search_sub_headings("FEVER", AgeGroup::OneToThreeMonths)
            .await
            .expect("search");
        assert_eq!(hits.iter().map(|s| s.id).collect::<Vec<_>>(), vec![sub.id]);

        let hits = repo
            .search_sub_headings("temperature", AgeGroup::OneToThreeMonths)
            .await
            .expect("search");
        assert_eq!(hits.len(), 1);

        let hits = repo
            .search_sub_headings("fever", AgeGroup::TwoToFiveYears)
            .await
            .expect("search");
        assert!(hits.is_empty());
    }
}
