use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// argon2 PHC string
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
    pub is_active: bool,
}
