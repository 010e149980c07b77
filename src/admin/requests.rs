use serde::Deserialize;

#[derive(Deserialize)]
pub struct AddUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct SearchUserRequest {
    pub keyword: Option<String>,
    pub role: Option<String>,
    pub first_index: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct ModifyUserRequest {
    pub id: u64,
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}
