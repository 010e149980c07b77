use serde::Deserialize;

#[derive(Deserialize)]
pub struct SummaryRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub doctor_id: Option<u64>,
}
