use serde::{Deserialize, Serialize};

/// Uniform error envelope (RFC 9457 problem document).
///
/// Every failure leaving the server uses this shape, whether it comes from
/// token handling, the user directory or body validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
}

impl ErrorResponse {
    pub fn new(status: u16, title: &str, detail: &str, instance: &str) -> Self {
        Self {
            kind: "about:blank".to_string(),
            title: title.to_string(),
            status,
            detail: detail.to_string(),
            instance: instance.to_string(),
        }
    }
}
