use serde::Serialize;

#[derive(Default, Serialize)]
pub struct SearchReminderItem {
    pub appointment_id: u64,
    pub scheduled_at: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: String,
    pub next_retry_at: String,
    pub sent_at: String,
}

#[derive(Default, Serialize)]
pub struct SearchReminderResponse {
    pub success: bool,
    pub err: String,
    pub total: i64,
    pub reminders: Vec<SearchReminderItem>,
}

#[derive(Default, Serialize)]
pub struct BackfillResponse {
    pub success: bool,
    pub err: String,
    pub scanned: u64,
    pub upserted: u64,
    pub failed: u64,
}

crate::impl_err_response! {
    SearchReminderResponse,
    BackfillResponse,
}
