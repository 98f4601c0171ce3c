use thiserror::Error;

use crate::util::compact_text;

/// Errors talking to the remote directory or report API.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response or a `success: false` body
    #[error("Remote API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),
}

/// Build an `Api` error from a failed response, preferring the JSON
/// `message` or `error` field over the raw body.
pub fn parse_api_error(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"].into_iter().find_map(|key| {
                value
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| compact_text(body));

    let message = if message.is_empty() {
        "empty response body".to_string()
    } else {
        message
    };
    RemoteError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_error_prefers_json_message() {
        let error = parse_api_error(503, r#"{"success":false,"message":"Maintenance window"}"#);
        assert_eq!(
            error.to_string(),
            "Remote API error (HTTP 503): Maintenance window"
        );
    }

    #[test]
    fn parse_api_error_falls_back_to_body_text() {
        let error = parse_api_error(502, "  Bad Gateway  ");
        assert!(matches!(
            error,
            RemoteError::Api { status: 502, ref message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn parse_api_error_handles_empty_body() {
        let error = parse_api_error(500, "");
        assert!(error.to_string().contains("empty response body"));
    }
}
