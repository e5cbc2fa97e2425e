use sqlx::MySqlPool;

use crate::error::AppError;

/// Object key of the employee's registered reference selfie
pub async fn find_reference(pool: &MySqlPool, employee_id: u64) -> Result<Option<String>, AppError> {
    let key = sqlx::query_scalar::<_, String>("SELECT selfie_key FROM employee_selfies WHERE employee_id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?;
    Ok(key)
}

/// Registers `key` as the reference selfie and returns the key it replaced.
pub async fn replace_reference(pool: &MySqlPool, employee_id: u64, key: &str) -> Result<Option<String>, AppError> {
    let mut tx = pool.begin().await?;

    let previous = sqlx::query_scalar::<_, String>(
        "SELECT selfie_key FROM employee_selfies WHERE employee_id = ? FOR UPDATE",
    )
    .bind(employee_id)
    .fetch_optional(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO employee_selfies (employee_id, selfie_key)
        VALUES (?, ?)
        ON DUPLICATE KEY UPDATE selfie_key = VALUES(selfie_key)
        "#,
    )
    .bind(employee_id)
    .bind(key)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(previous.filter(|p| p != key))
}
