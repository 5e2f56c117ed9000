use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::Value;
use tracing::warn;

const REDACTED_BEARER: &str = "Bearer <redacted>";
const REDACTED: &str = "<redacted>";
const MAX_LOGGED_BODY: usize = 4096;

/// JSON keys whose values never reach the log, compared after lower-casing
/// and dropping underscores so `refreshToken` and `refresh_token` both match.
const SECRET_KEYS: &[&str] = &[
    "accesstoken",
    "refreshtoken",
    "idtoken",
    "identitytoken",
    "token",
];

/// Everything logged about a failed exchange. Bearer tokens and token
/// fields in JSON bodies never reach the log; see [`redact_headers`] and
/// [`redact_body`].
#[derive(Debug, Clone)]
pub struct FailureRecord<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub request_headers: &'a HeaderMap,
    pub request_body: Option<&'a [u8]>,
    pub status: Option<u16>,
    pub response_headers: Option<&'a HeaderMap>,
    pub response_body: &'a [u8],
}

impl FailureRecord<'_> {
    pub fn log(&self, reason: &str) {
        warn!(
            method = %self.method,
            url = %self.url,
            request_headers = %redact_headers(self.request_headers),
            request_body = %self.request_body.map(redact_body).unwrap_or_default(),
            status = ?self.status,
            response_headers = %self.response_headers.map(redact_headers).unwrap_or_default(),
            response_body = %redact_body(self.response_body),
            "API request failed: {}",
            reason
        );
    }
}

/// Render headers as `name: value` pairs with the Authorization value
/// replaced.
pub fn redact_headers(headers: &HeaderMap) -> String {
    let mut rendered: Vec<String> = headers
        .iter()
        .map(|(name, value)| {
            if *name == AUTHORIZATION {
                format!("{}: {}", name, REDACTED_BEARER)
            } else {
                format!("{}: {}", name, value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect();
    rendered.sort();
    rendered.join(", ")
}

/// Body text for the log. JSON bodies have every token field replaced;
/// anything else is logged as received.
pub fn redact_body(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(mut value) => {
            redact_value(&mut value);
            body_preview(value.to_string().as_bytes())
        }
        Err(_) => body_preview(body),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_secret_key(key) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

fn is_secret_key(key: &str) -> bool {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    SECRET_KEYS.contains(&folded.as_str())
}

fn body_preview(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_LOGGED_BODY {
        return text.into_owned();
    }
    let mut end = MAX_LOGGED_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &text[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    #[test]
    fn test_bearer_token_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret-token-123"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let rendered = redact_headers(&headers);
        assert!(!rendered.contains("secret-token-123"));
        assert!(rendered.contains("authorization: Bearer <redacted>"));
        assert!(rendered.contains("content-type: application/json"));
    }

    #[test]
    fn test_token_fields_redacted_in_body() {
        let body = br#"{"refreshToken":"r-secret","user":{"id":"u1","access_token":"a-secret"},"items":[{"idToken":"i-secret"}]}"#;
        let rendered = redact_body(body);

        for secret in ["r-secret", "a-secret", "i-secret"] {
            assert!(!rendered.contains(secret), "{} leaked in {}", secret, rendered);
        }
        assert!(rendered.contains(r#""refreshToken":"<redacted>""#));
        assert!(rendered.contains(r#""id":"u1""#));
    }

    #[test]
    fn test_non_json_body_kept() {
        assert_eq!(redact_body(b"gateway timeout"), "gateway timeout");
        assert_eq!(redact_body(b""), "<empty>");
    }

    #[test]
    fn test_body_preview_truncates() {
        let body = vec![b'a'; MAX_LOGGED_BODY + 10];
        let preview = body_preview(&body);
        assert!(preview.ends_with(&format!("({} bytes)", MAX_LOGGED_BODY + 10)));
        assert_eq!(body_preview(b""), "<empty>");
    }
}
