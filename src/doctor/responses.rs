use serde::Serialize;

#[derive(Default, Serialize)]
pub struct DoctorItem {
    pub id: u64,
    pub user_id: Option<u64>,
    pub name: String,
    pub specialty: String,
    pub telephone: String,
}

#[derive(Default, Serialize)]
pub struct SearchDoctorResponse {
    pub success: bool,
    pub err: String,
    pub total: i64,
    pub doctors: Vec<DoctorItem>,
}

#[derive(Default, Serialize)]
pub struct ViewDoctorResponse {
    pub success: bool,
    pub err: String,
    pub doctor: DoctorItem,
}

crate::impl_err_response! {
    SearchDoctorResponse,
    ViewDoctorResponse,
}
