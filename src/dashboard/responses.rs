use serde::Serialize;

use crate::appointment::responses::AppointItem;

#[derive(Default, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Default, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub err: String,
    pub total: i64,
    pub counts: Vec<StatusCount>,
    pub upcoming: Vec<AppointItem>,
}

crate::impl_err_response! {
    SummaryResponse,
}
