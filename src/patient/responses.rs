use serde::Serialize;

#[derive(Default, Serialize)]
pub struct PatientItem {
    pub id: u64,
    pub name: String,
    pub gender: String,
    pub birthday: String,
    pub age: i32,
    pub telephone: String,
    pub email: String,
    pub notes: String,
}

#[derive(Default, Serialize)]
pub struct SearchPatientResponse {
    pub success: bool,
    pub err: String,
    pub total: i64,
    pub patients: Vec<PatientItem>,
}

#[derive(Default, Serialize)]
pub struct ViewPatientResponse {
    pub success: bool,
    pub err: String,
    pub patient: PatientItem,
}

crate::impl_err_response! {
    SearchPatientResponse,
    ViewPatientResponse,
}
