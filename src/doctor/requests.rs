use serde::Deserialize;

use crate::protocol::nullable;

#[derive(Deserialize)]
pub struct SearchDoctorRequest {
    pub keyword: Option<String>,
    pub specialty: Option<String>,
    pub first_index: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct DoctorIdRequest {
    pub id: u64,
}

#[derive(Deserialize)]
pub struct AddDoctorRequest {
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub telephone: String,
    pub user_id: Option<u64>,
}

#[derive(Deserialize)]
pub struct ModifyDoctorRequest {
    pub id: u64,
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub telephone: Option<String>,
    /// `null` unlinks the login.
    #[serde(default, deserialize_with = "nullable")]
    pub user_id: Option<Option<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modify(body: &str) -> ModifyDoctorRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn user_link_can_be_kept_set_or_cleared() {
        assert_eq!(modify(r#"{"id": 1, "name": "Lee"}"#).user_id, None);
        assert_eq!(modify(r#"{"id": 1, "user_id": null}"#).user_id, Some(None));
        assert_eq!(modify(r#"{"id": 1, "user_id": 9}"#).user_id, Some(Some(9)));
    }
}
