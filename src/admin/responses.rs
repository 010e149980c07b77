use serde::Serialize;

#[derive(Default, Serialize)]
pub struct SearchUserItem {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Default, Serialize)]
pub struct SearchUserResponse {
    pub success: bool,
    pub err: String,
    pub total: i64,
    pub users: Vec<SearchUserItem>,
}

crate::impl_err_response! {
    SearchUserResponse,
}
