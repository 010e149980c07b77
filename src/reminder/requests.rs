use serde::Deserialize;

#[derive(Deserialize)]
pub struct SearchReminderRequest {
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub first_index: Option<i64>,
    pub limit: Option<i64>,
}
