use serde::Deserialize;

#[derive(Deserialize)]
pub struct RegisterAdminRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ModifyPasswordRequest {
    pub password_old: String,
    pub password_new: String,
}
