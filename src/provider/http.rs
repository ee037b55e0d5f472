//! Shared HTTP client and auth utilities.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::MedicError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("medic/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Build default headers for a Bearer-token API. No key, no auth header.
pub fn bearer_headers(api_key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {key}")) {
            headers.insert(AUTHORIZATION, val);
        }
    }
    headers
}

/// Map an unsuccessful HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> MedicError {
    let message = error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        401 | 403 => MedicError::Authentication(message),
        429 => MedicError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => MedicError::api(status, message),
    }
}

/// Pull `error.message` out of an OpenAI-style error body.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_auth_and_rate_limit_statuses() {
        assert!(matches!(
            status_to_error(401, r#"{"error":{"message":"bad key"}}"#),
            MedicError::Authentication(m) if m == "bad key"
        ));
        assert!(matches!(
            status_to_error(429, r#"{"error":{"retry_after":1.5}}"#),
            MedicError::RateLimited { retry_after_ms: Some(1500) }
        ));
        assert!(matches!(
            status_to_error(500, "oops"),
            MedicError::Api { status: 500, message } if message == "oops"
        ));
    }

    #[test]
    fn bearer_header_only_with_key() {
        assert!(bearer_headers(None).get(AUTHORIZATION).is_none());
        assert!(bearer_headers(Some("")).get(AUTHORIZATION).is_none());
        assert_eq!(
            bearer_headers(Some("sk")).get(AUTHORIZATION).unwrap(),
            "Bearer sk"
        );
    }
}
