use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({"username": "lead@company.com", "password": "s3cret"}))]
pub struct LoginReqDto {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginUser {
    pub id: u64,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// seconds
    #[schema(example = 2592000)]
    pub expires_in: usize,
    pub user: LoginUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    /// Token revision at issue time; older than the stored revision means revoked
    pub rev: u64,
    pub exp: usize,
    pub jti: String,
}
