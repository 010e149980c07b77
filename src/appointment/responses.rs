use serde::Serialize;

#[derive(Default, Serialize)]
pub struct AppointItem {
    pub id: u64,
    pub patient_id: u64,
    pub patient_name: String,
    pub doctor_id: u64,
    pub doctor_name: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub reason: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Default, Serialize)]
pub struct SearchAppointResponse {
    pub success: bool,
    pub err: String,
    pub total: i64,
    pub appointments: Vec<AppointItem>,
}

#[derive(Default, Serialize)]
pub struct ViewAppointResponse {
    pub success: bool,
    pub err: String,
    pub appointment: AppointItem,
}

#[derive(Default, Serialize)]
pub struct CalendarDay {
    pub date: String,
    pub appointments: Vec<AppointItem>,
}

#[derive(Default, Serialize)]
pub struct CalendarResponse {
    pub success: bool,
    pub err: String,
    pub days: Vec<CalendarDay>,
}

crate::impl_err_response! {
    SearchAppointResponse,
    ViewAppointResponse,
    CalendarResponse,
}
