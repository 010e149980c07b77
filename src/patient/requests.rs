use serde::Deserialize;

#[derive(Deserialize)]
pub struct SearchPatientRequest {
    pub keyword: Option<String>,
    pub first_index: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct PatientIdRequest {
    pub id: u64,
}

#[derive(Deserialize)]
pub struct AddPatientRequest {
    pub name: String,
    #[serde(default)]
    pub gender: String,
    pub birthday: Option<String>,
    #[serde(default)]
    pub telephone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Deserialize)]
pub struct ModifyPatientRequest {
    pub id: u64,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}
