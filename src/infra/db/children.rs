use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::Date;

use crate::{
    application::repos::{ChildrenRepo, CreateChildParams, RepoError, UpdateChildParams},
    domain::entities::ChildRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ChildRow {
    id: i64,
    user_id: i64,
    name: String,
    dob: Date,
    active: bool,
}

impl From<ChildRow> for ChildRecord {
    fn from(row: ChildRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            dob: row.dob,
            active: row.active,
        }
    }
}

const CHILD_COLUMNS: &str = "id, user_id, name, dob, active";

/// Deactivate every child of the user, then activate one. Two statements so
/// the partial unique index on active children never sees two rows at once.
async fn swap_active(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    child_id: i64,
) -> Result<(), RepoError> {
    sqlx::query("UPDATE children SET active = FALSE WHERE user_id = $1 AND active")
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    sqlx::query("UPDATE children SET active = TRUE WHERE user_id = $1 AND id = $2")
        .bind(user_id)
        .bind(child_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

/// Serialize active-child changes per user.
async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<(), RepoError> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl ChildrenRepo for PostgresRepositories {
    async fn list_children(&self, user_id: i64) -> Result<Vec<ChildRecord>, RepoError> {
        let sql = format!(
            "SELECT {CHILD_COLUMNS} FROM children WHERE user_id = $1 ORDER BY dob DESC, id"
        );
        let rows = sqlx::query_as::<_, ChildRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ChildRecord::from).collect())
    }

    async fn find_child(
        &self,
        user_id: i64,
        child_id: i64,
    ) -> Result<Option<ChildRecord>, RepoError> {
        let sql = format!("SELECT {CHILD_COLUMNS} FROM children WHERE user_id = $1 AND id = $2");
        let row = sqlx::query_as::<_, ChildRow>(&sql)
            .bind(user_id)
            .bind(child_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ChildRecord::from))
    }

    async fn active_child(&self, user_id: i64) -> Result<Option<ChildRecord>, RepoError> {
        let sql = format!("SELECT {CHILD_COLUMNS} FROM children WHERE user_id = $1 AND active");
        let row = sqlx::query_as::<_, ChildRow>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ChildRecord::from))
    }

    async fn create_child(&self, params: CreateChildParams) -> Result<ChildRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        lock_user(&mut tx, params.user_id).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO children (user_id, name, dob, active) VALUES ($1, $2, $3, FALSE) \
             RETURNING id",
        )
        .bind(params.user_id)
        .bind(&params.name)
        .bind(params.dob)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        swap_active(&mut tx, params.user_id, id).await?;

        let sql = format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = $1");
        let row = sqlx::query_as::<_, ChildRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_child(
        &self,
        params: UpdateChildParams,
    ) -> Result<Option<ChildRecord>, RepoError> {
        let sql = format!(
            "UPDATE children SET name = $3, dob = $4 WHERE id = $1 AND user_id = $2 \
             RETURNING {CHILD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ChildRow>(&sql)
            .bind(params.id)
            .bind(params.user_id)
            .bind(&params.name)
            .bind(params.dob)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ChildRecord::from))
    }

    async fn activate_child(&self, user_id: i64, child_id: i64) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        lock_user(&mut tx, user_id).await?;

        let owned: Option<i64> =
            sqlx::query_scalar("SELECT id FROM children WHERE user_id = $1 AND id = $2")
                .bind(user_id)
                .bind(child_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        if owned.is_none() {
            return Ok(false);
        }

        swap_active(&mut tx, user_id, child_id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(true)
    }

    async fn delete_child(&self, user_id: i64, child_id: i64) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        lock_user(&mut tx, user_id).await?;

        let was_active: Option<bool> = sqlx::query_scalar(
            "DELETE FROM children WHERE user_id = $1 AND id = $2 RETURNING active",
        )
        .bind(user_id)
        .bind(child_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(was_active) = was_active else {
            return Ok(false);
        };

        if was_active {
            let next: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM children WHERE user_id = $1 ORDER BY dob DESC, id LIMIT 1",
            )
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            if let Some(next) = next {
                swap_active(&mut tx, user_id, next).await?;
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(true)
    }
}
