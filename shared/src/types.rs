//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Uniform response envelope: `{success, data?, message?}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_message() {
        let json = serde_json::to_value(ApiResponse::ok(5)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 5 }));
    }

    #[test]
    fn test_message_is_included_when_set() {
        let json = serde_json::to_value(ApiResponse::with_message("po-1", "Created")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": true, "data": "po-1", "message": "Created" })
        );
    }
}
