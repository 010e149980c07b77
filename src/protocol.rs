use serde::{Deserialize, Deserializer, Serialize};

/// Body of endpoints that need nothing besides the bearer token.
#[derive(Deserialize)]
pub struct EmptyRequest {}

/// For `Option<Option<T>>` fields together with `#[serde(default)]`: a
/// missing field stays `None` while an explicit `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Default, Serialize)]
pub struct SimpleResponse {
    pub success: bool,
    pub err: String,
}

impl SimpleResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            err: "".to_string(),
        }
    }
}

/// Returned by every `add*` endpoint.
#[derive(Default, Serialize)]
pub struct IdResponse {
    pub success: bool,
    pub err: String,
    pub id: u64,
}

impl IdResponse {
    pub fn ok(id: u64) -> Self {
        Self {
            success: true,
            err: "".to_string(),
            id,
        }
    }
}

#[macro_export]
macro_rules! impl_err_response {
    ( $( $type:ty),+ $(,)? ) => {
        $(
            impl $type {
                pub fn err<S: ToString>(err: S) -> Self {
                    Self {
                        success: false,
                        err: err.to_string(),
                        ..Default::default()
                    }
                }
            }
        )+
    };
}

impl_err_response! {
    SimpleResponse,
    IdResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_envelope_has_empty_err() {
        let value = serde_json::to_value(SimpleResponse::ok()).unwrap();
        assert_eq!(value, json!({ "success": true, "err": "" }));
    }

    #[test]
    fn err_envelope_keeps_payload_defaults() {
        let value = serde_json::to_value(IdResponse::err("No such patient")).unwrap();
        assert_eq!(
            value,
            json!({ "success": false, "err": "No such patient", "id": 0 })
        );
    }
}
