use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::credential::GoogleAuthCredential;
use crate::persistence::CredentialStore;

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get(&self, user_id: &str) -> anyhow::Result<Option<GoogleAuthCredential>> {
        let credential = sqlx::query_as::<_, GoogleAuthCredential>(
            r#"
            SELECT user_id, access_token, refresh_token, access_token_expires
            FROM google_auth_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credential)
    }

    async fn upsert(&self, credential: &GoogleAuthCredential) -> anyhow::Result<()> {
        // Google only returns a refresh token on first consent; keep the stored one otherwise.
        sqlx::query(
            r#"
            INSERT INTO google_auth_credentials (user_id, access_token, refresh_token, access_token_expires)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, google_auth_credentials.refresh_token),
                access_token_expires = EXCLUDED.access_token_expires,
                updated_at = now()
            "#,
        )
        .bind(&credential.user_id)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.access_token_expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
