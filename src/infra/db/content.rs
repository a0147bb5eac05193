use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{
        CategoryParams, ContentRepo, ContentWriteRepo, RepoError, SubHeadingParams,
    },
    domain::{
        entities::{CategoryRecord, HeadingRecord, SubHeadingRecord},
        types::AgeGroup,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: String,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HeadingRow {
    id: i64,
    category_id: i64,
    text: String,
}

impl From<HeadingRow> for HeadingRecord {
    fn from(row: HeadingRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            text: row.text,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubHeadingRow {
    id: i64,
    heading_id: i64,
    title: String,
    text: String,
    age_groups: Vec<i16>,
    last_edited: OffsetDateTime,
}

impl TryFrom<SubHeadingRow> for SubHeadingRecord {
    type Error = RepoError;

    fn try_from(row: SubHeadingRow) -> Result<Self, Self::Error> {
        let age_groups = row
            .age_groups
            .into_iter()
            .map(AgeGroup::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RepoError::Integrity {
                message: format!("sub-heading {}: {err}", row.id),
            })?;
        Ok(Self {
            id: row.id,
            heading_id: row.heading_id,
            title: row.title,
            text: row.text,
            age_groups,
            last_edited: row.last_edited,
        })
    }
}

fn sub_headings(rows: Vec<SubHeadingRow>) -> Result<Vec<SubHeadingRecord>, RepoError> {
    rows.into_iter().map(SubHeadingRecord::try_from).collect()
}

fn age_codes(groups: &[AgeGroup]) -> Vec<i16> {
    groups.iter().map(|group| group.code()).collect()
}

const CATEGORY_COLUMNS: &str = "id, name, description";
const HEADING_COLUMNS: &str = "id, category_id, text";
const SUB_HEADING_COLUMNS: &str = "id, heading_id, title, text, age_groups, last_edited";

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name");
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(CategoryRecord::from))
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(CategoryRecord::from))
    }

    async fn list_headings(&self, category_id: i64) -> Result<Vec<HeadingRecord>, RepoError> {
        let sql =
            format!("SELECT {HEADING_COLUMNS} FROM headings WHERE category_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, HeadingRow>(&sql)
            .bind(category_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(HeadingRecord::from).collect())
    }

    async fn list_headings_for_symptom(
        &self,
        name: &str,
    ) -> Result<Vec<HeadingRecord>, RepoError> {
        let rows = sqlx::query_as::<_, HeadingRow>(
            r#"
            SELECT h.id, h.category_id, h.text
            FROM headings h
            INNER JOIN categories c ON c.id = h.category_id
            WHERE c.name = $1
            ORDER BY h.id
            "#,
        )
        .bind(name)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(HeadingRecord::from).collect())
    }

    async fn list_all_headings(&self) -> Result<Vec<HeadingRecord>, RepoError> {
        let sql = format!("SELECT {HEADING_COLUMNS} FROM headings ORDER BY id");
        let rows = sqlx::query_as::<_, HeadingRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(HeadingRecord::from).collect())
    }

    async fn find_heading(&self, id: i64) -> Result<Option<HeadingRecord>, RepoError> {
        let sql = format!("SELECT {HEADING_COLUMNS} FROM headings WHERE id = $1");
        let row = sqlx::query_as::<_, HeadingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(HeadingRecord::from))
    }

    async fn list_sub_headings(
        &self,
        heading_id: i64,
    ) -> Result<Vec<SubHeadingRecord>, RepoError> {
        let sql = format!(
            "SELECT {SUB_HEADING_COLUMNS} FROM sub_headings WHERE heading_id = $1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, SubHeadingRow>(&sql)
            .bind(heading_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        sub_headings(rows)
    }

    async fn list_visible_sub_headings(
        &self,
        heading_id: i64,
        age_group: AgeGroup,
    ) -> Result<Vec<SubHeadingRecord>, RepoError> {
        let sql = format!(
            "SELECT {SUB_HEADING_COLUMNS} FROM sub_headings \
             WHERE heading_id = $1 AND $2 = ANY(age_groups) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, SubHeadingRow>(&sql)
            .bind(heading_id)
            .bind(age_group.code())
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        sub_headings(rows)
    }

    async fn list_all_sub_headings(&self) -> Result<Vec<SubHeadingRecord>, RepoError> {
        let sql = format!("SELECT {SUB_HEADING_COLUMNS} FROM sub_headings ORDER BY id");
        let rows = sqlx::query_as::<_, SubHeadingRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        sub_headings(rows)
    }

    async fn find_sub_heading(&self, id: i64) -> Result<Option<SubHeadingRecord>, RepoError> {
        let sql = format!("SELECT {SUB_HEADING_COLUMNS} FROM sub_headings WHERE id = $1");
        let row = sqlx::query_as::<_, SubHeadingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(SubHeadingRecord::try_from).transpose()
    }

    async fn search_sub_headings(
        &self,
        query: &str,
        age_group: AgeGroup,
    ) -> Result<Vec<SubHeadingRecord>, RepoError> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query_as::<_, SubHeadingRow>(
            r#"
            SELECT s.id, s.heading_id, s.title, s.text, s.age_groups, s.last_edited
            FROM sub_headings s
            INNER JOIN headings h ON h.id = s.heading_id
            INNER JOIN categories c ON c.id = h.category_id
            WHERE $2 = ANY(s.age_groups)
              AND (
                  h.text ILIKE $1
                  OR c.description ILIKE $1
                  OR c.name ILIKE $1
                  OR s.title ILIKE $1
                  OR s.text ILIKE $1
              )
            ORDER BY s.id
            "#,
        )
        .bind(pattern)
        .bind(age_group.code())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        sub_headings(rows)
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl ContentWriteRepo for PostgresRepositories {
    async fn create_category(&self, params: CategoryParams) -> Result<CategoryRecord, RepoError> {
        let sql = format!(
            "INSERT INTO categories (name, description) VALUES ($1, $2) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(&params.name)
            .bind(&params.description)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_category(
        &self,
        id: i64,
        params: CategoryParams,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let sql = format!(
            "UPDATE categories SET name = $2, description = $3 WHERE id = $1 \
             RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .bind(&params.name)
            .bind(&params.description)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(CategoryRecord::from))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_heading(
        &self,
        category_id: i64,
        text: &str,
    ) -> Result<HeadingRecord, RepoError> {
        let sql = format!(
            "INSERT INTO headings (category_id, text) VALUES ($1, $2) RETURNING {HEADING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, HeadingRow>(&sql)
            .bind(category_id)
            .bind(text)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_heading(
        &self,
        id: i64,
        text: &str,
    ) -> Result<Option<HeadingRecord>, RepoError> {
        let sql =
            format!("UPDATE headings SET text = $2 WHERE id = $1 RETURNING {HEADING_COLUMNS}");
        let row = sqlx::query_as::<_, HeadingRow>(&sql)
            .bind(id)
            .bind(text)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(HeadingRecord::from))
    }

    async fn delete_heading(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM headings WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_sub_heading(
        &self,
        params: SubHeadingParams,
    ) -> Result<SubHeadingRecord, RepoError> {
        let sql = format!(
            "INSERT INTO sub_headings (heading_id, title, text, age_groups, last_edited) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SUB_HEADING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubHeadingRow>(&sql)
            .bind(params.heading_id)
            .bind(&params.title)
            .bind(&params.text)
            .bind(age_codes(&params.age_groups))
            .bind(params.edited_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn update_sub_heading(
        &self,
        id: i64,
        params: SubHeadingParams,
    ) -> Result<Option<SubHeadingRecord>, RepoError> {
        let sql = format!(
            "UPDATE sub_headings \
             SET heading_id = $2, title = $3, text = $4, age_groups = $5, last_edited = $6 \
             WHERE id = $1 RETURNING {SUB_HEADING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubHeadingRow>(&sql)
            .bind(id)
            .bind(params.heading_id)
            .bind(&params.title)
            .bind(&params.text)
            .bind(age_codes(&params.age_groups))
            .bind(params.edited_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(SubHeadingRecord::try_from).transpose()
    }

    async fn delete_sub_heading(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM sub_headings WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("fever"), "fever");
    }

    #[test]
    fn unknown_age_codes_are_integrity_errors() {
        let row = SubHeadingRow {
            id: 3,
            heading_id: 1,
            title: "t".into(),
            text: String::new(),
            age_groups: vec![0, 9],
            last_edited: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(matches!(
            SubHeadingRecord::try_from(row),
            Err(RepoError::Integrity { .. })
        ));
    }
}
