//! Standard response envelope for JSON payloads.

use crate::JsonMap;
use serde::{Deserialize, Serialize};

/// Error member of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub text: String,
}

/// `{"error": {...}, "response": {...}, "data": {...}}`, absent members omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonMap>,
}

impl ApiResponse {
    /// Wrap a JSON document as served to readers.
    pub fn data(data: JsonMap) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn error(code: u16, text: impl Into<String>) -> Self {
        Self {
            error: Some(ApiError {
                code,
                text: text.into(),
            }),
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_envelope_omits_absent_members() {
        let mut map = JsonMap::new();
        map.insert("a".to_string(), json!(1));
        let bytes = ApiResponse::data(map).to_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"data":{"a":1}}"#);
    }

    #[test]
    fn test_error_envelope_shape() {
        let bytes = ApiResponse::error(404, "not found").to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"error": {"code": 404, "text": "not found"}}));
    }

    #[test]
    fn test_envelope_parses_back() {
        let parsed = ApiResponse::from_bytes(br#"{"data":{"_id":"x","a":1}}"#).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(data.get("a"), Some(&json!(1)));
        assert!(parsed.error.is_none());
    }
}
