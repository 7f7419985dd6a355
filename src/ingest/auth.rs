// src/ingest/auth.rs
//! Application-only OAuth2: trade consumer key/secret for a bearer token.

use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::providers::twitter::ApiErrors;
use crate::ingest::types::Credential;

pub const DEFAULT_TOKEN_URL: &str = "https://api.twitter.com/oauth2/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token_type: Option<String>,
    access_token: String,
}

pub fn parse_token_response(body: &str) -> Result<Credential, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body.trim())?;
    if value.get("errors").is_some() {
        let errs: ApiErrors = serde_json::from_value(value)?;
        return Err(errs.into_fetch_error());
    }
    let token: TokenResponse = serde_json::from_value(value)?;
    if let Some(kind) = token.token_type.as_deref() {
        if !kind.eq_ignore_ascii_case("bearer") {
            return Err(FetchError::Payload(format!("unexpected token_type {kind}")));
        }
    }
    if token.access_token.trim().is_empty() {
        return Err(FetchError::Payload("empty access_token".into()));
    }
    Ok(Credential::new(token.access_token))
}

pub async fn fetch_bearer_token(
    client: &reqwest::Client,
    token_url: &str,
    consumer_key: &str,
    consumer_secret: &str,
) -> Result<Credential, FetchError> {
    let resp = client
        .post(token_url)
        .basic_auth(consumer_key, Some(consumer_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await?;
    match parse_token_response(&body) {
        Ok(token) => Ok(token),
        Err(FetchError::Payload(_)) if !status.is_success() => Err(FetchError::Api {
            code: i64::from(status.as_u16()),
            label: None,
            message: format!("POST {token_url} returned {status}"),
        }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_yields_credential() {
        let c = parse_token_response(r#"{"token_type":"bearer","access_token":"AAAA%2FAAA"}"#)
            .unwrap();
        assert_eq!(c.secret(), "AAAA%2FAAA");
    }

    #[test]
    fn labelled_error_is_kept() {
        let body = r#"{"errors":[{"code":99,"label":"authenticity_token_error","message":"Unable to verify your credentials"}]}"#;
        match parse_token_response(body) {
            Err(FetchError::Api { code, label, .. }) => {
                assert_eq!(code, 99);
                assert_eq!(label.as_deref(), Some("authenticity_token_error"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wrong_token_type_is_rejected() {
        let body = r#"{"token_type":"mac","access_token":"x"}"#;
        assert!(matches!(
            parse_token_response(body),
            Err(FetchError::Payload(_))
        ));
    }
}
