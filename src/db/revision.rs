//! Per-user token revision. Tokens embed the revision current at login;
//! bumping it revokes every token issued before.

use sqlx::MySqlPool;

use crate::error::AppError;

/// Increments (or creates) the user's revision and returns the new value.
pub async fn bump(pool: &MySqlPool, user_id: u64) -> Result<u64, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO token_revisions (user_id, revision)
        VALUES (?, 1)
        ON DUPLICATE KEY UPDATE revision = revision + 1
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let revision = sqlx::query_scalar::<_, u64>("SELECT revision FROM token_revisions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(revision)
}

pub async fn current(pool: &MySqlPool, user_id: u64) -> Result<Option<u64>, AppError> {
    let revision = sqlx::query_scalar::<_, u64>("SELECT revision FROM token_revisions WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(revision)
}

/// A token is live only while the user has a revision row and the token
/// carries at least that revision.
pub fn is_current(token_revision: u64, current: Option<u64>) -> bool {
    matches!(current, Some(current) if token_revision >= current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_tokens_are_revoked() {
        assert!(is_current(3, Some(3)));
        assert!(!is_current(2, Some(3)));
    }

    #[test]
    fn missing_revision_row_revokes_everything() {
        assert!(!is_current(1, None));
    }
}
