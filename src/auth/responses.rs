use serde::Serialize;

#[derive(Default, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub err: String,
    pub token: String,
    pub id: u64,
    pub name: String,
    pub role: String,
}

#[derive(Default, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub err: String,
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub doctor_id: Option<u64>,
}

crate::impl_err_response! {
    LoginResponse,
    MeResponse,
}
