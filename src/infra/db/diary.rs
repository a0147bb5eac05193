use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{CreateDiaryLogParams, DiaryRepo, RepoError, UpdateDiaryLogParams},
    domain::entities::DiaryLogRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct DiaryLogRow {
    id: i64,
    child_id: i64,
    title: String,
    text: String,
    image: Option<String>,
    created_on: OffsetDateTime,
}

impl From<DiaryLogRow> for DiaryLogRecord {
    fn from(row: DiaryLogRow) -> Self {
        Self {
            id: row.id,
            child_id: row.child_id,
            title: row.title,
            text: row.text,
            image: row.image,
            created_on: row.created_on,
        }
    }
}

const LOG_COLUMNS: &str = "id, child_id, title, text, image, created_on";

#[async_trait]
impl DiaryRepo for PostgresRepositories {
    async fn list_logs(&self, child_id: i64) -> Result<Vec<DiaryLogRecord>, RepoError> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM diary_logs WHERE child_id = $1 ORDER BY created_on, id"
        );
        let rows = sqlx::query_as::<_, DiaryLogRow>(&sql)
            .bind(child_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(DiaryLogRecord::from).collect())
    }

    async fn find_log(&self, id: i64) -> Result<Option<DiaryLogRecord>, RepoError> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM diary_logs WHERE id = $1");
        let row = sqlx::query_as::<_, DiaryLogRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(DiaryLogRecord::from))
    }

    async fn create_log(&self, params: CreateDiaryLogParams) -> Result<DiaryLogRecord, RepoError> {
        let sql = format!(
            "INSERT INTO diary_logs (child_id, title, text, image, created_on) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {LOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DiaryLogRow>(&sql)
            .bind(params.child_id)
            .bind(&params.title)
            .bind(&params.text)
            .bind(params.image.as_deref())
            .bind(params.created_on)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_log(
        &self,
        params: UpdateDiaryLogParams,
    ) -> Result<Option<DiaryLogRecord>, RepoError> {
        let sql = format!(
            "UPDATE diary_logs SET title = $2, text = $3, image = $4 WHERE id = $1 \
             RETURNING {LOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DiaryLogRow>(&sql)
            .bind(params.id)
            .bind(&params.title)
            .bind(&params.text)
            .bind(params.image.as_deref())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(DiaryLogRecord::from))
    }

    async fn delete_log(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM diary_logs WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
