use serde::Deserialize;

#[derive(Deserialize)]
pub struct SearchAppointRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub status: Vec<String>,
    pub doctor_id: Option<u64>,
    pub patient_id: Option<u64>,
    pub first_index: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct AppointIdRequest {
    pub id: u64,
}

#[derive(Deserialize)]
pub struct AddAppointRequest {
    pub patient_id: u64,
    pub doctor_id: u64,
    pub start_time: String,
    pub end_time: String,
    pub status: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Deserialize)]
pub struct ModifyAppointRequest {
    pub id: u64,
    pub patient_id: Option<u64>,
    pub doctor_id: Option<u64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub id: u64,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CalendarRequest {
    pub start_time: String,
    pub end_time: String,
    pub doctor_id: Option<u64>,
}
