//! Persisted session pointer.

use shopsync_engine::UserId;

use super::LocalStore;

impl LocalStore {
    pub async fn save_session(&self, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO session (slot, user_id) VALUES (1, ?)
            ON CONFLICT (slot) DO UPDATE SET user_id = excluded.user_id
            "#,
        )
        .bind(user_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn load_session(&self) -> Result<Option<UserId>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT user_id FROM session WHERE slot = 1")
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(|(user_id,)| user_id))
    }

    pub async fn clear_session(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM session").execute(self.pool()).await?;
        Ok(())
    }
}
