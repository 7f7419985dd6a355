//! Errors reported by fetch adapters.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transport,
    Api,
    Payload,
    Credential,
}

/// Single reportable error type for every adapter. Pollers log it and skip
/// the cycle without looking at the cause.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error {code}: {message}")]
    Api {
        code: i64,
        label: Option<String>,
        message: String,
    },

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("source {0} has no credential")]
    MissingCredential(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport(_) => FetchErrorKind::Transport,
            FetchError::Api { .. } => FetchErrorKind::Api,
            FetchError::Payload(_) => FetchErrorKind::Payload,
            FetchError::MissingCredential(_) => FetchErrorKind::Credential,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self.kind() {
            FetchErrorKind::Transport => "transport",
            FetchErrorKind::Api => "api",
            FetchErrorKind::Payload => "payload",
            FetchErrorKind::Credential => "credential",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Payload(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Payload(e.to_string())
    }
}

impl From<quick_xml::DeError> for FetchError {
    fn from(e: quick_xml::DeError) -> Self {
        FetchError::Payload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_has_code_and_message() {
        let e = FetchError::Api {
            code: 34,
            label: None,
            message: "Sorry, that page does not exist.".into(),
        };
        assert_eq!(e.to_string(), "api error 34: Sorry, that page does not exist.");
        assert_eq!(e.kind(), FetchErrorKind::Api);
    }

    #[test]
    fn json_errors_map_to_payload() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let e: FetchError = err.into();
        assert_eq!(e.kind_str(), "payload");
    }
}
