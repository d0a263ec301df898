use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::resume::{NewResume, ResumeDocument, ResumeRow};
use crate::persistence::ResumeStore;

/// Resumes in the `resumes` table, partitioned by `owner_user_id`.
#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn insert(&self, resume: NewResume) -> anyhow::Result<ResumeDocument> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes (id, owner_user_id, title, content, storage_path, file_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&resume.owner_user_id)
        .bind(&resume.title)
        .bind(&resume.content)
        .bind(&resume.storage_path)
        .bind(resume.file_type.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update(
        &self,
        id: Uuid,
        owner_user_id: &str,
        title: &str,
        content: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE resumes
            SET title = $3, content = $4, updated_at = now()
            WHERE id = $1 AND owner_user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_user_id)
        .bind(title)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, owner_user_id: &str) -> anyhow::Result<Vec<ResumeDocument>> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE owner_user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(owner_user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ResumeDocument::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ResumeDocument>> {
        let row = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ResumeDocument::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
