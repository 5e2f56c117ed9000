//! HTTP client for the whatEat REST API.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::failure::FailureRecord;

/// Query parameters appended to a request URL.
pub type Query<'a> = &'a [(&'a str, String)];

struct Exchange {
    status: u16,
    body: Bytes,
}

/// JSON client bound to one API root. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url + path` with `query` appended.
    pub fn endpoint(&self, path: &str, query: Query<'_>) -> Result<Url> {
        let mut url =
            Url::parse(&format!("{}{}", self.base_url, path)).map_err(|_| ApiError::InvalidUrl)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // ==================== JSON verbs ====================

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        token: Option<&str>,
    ) -> Result<T> {
        let url = self.endpoint(path, query)?;
        self.send_json(Method::GET, url, None, token).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path, &[])?;
        let body = encode_body(body)?;
        self.send_json(Method::POST, url, Some(body), token).await
    }

    /// POST with an empty `{}` body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        let url = self.endpoint(path, &[])?;
        self.send_json(Method::POST, url, Some(b"{}".to_vec()), token)
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path, &[])?;
        let body = encode_body(body)?;
        self.send_json(Method::PATCH, url, Some(body), token).await
    }

    /// DELETE; any 2xx succeeds and the body is ignored.
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<()> {
        let url = self.endpoint(path, &[])?;
        self.execute(Method::DELETE, url, json_headers(token)?, None)
            .await
            .map(|_| ())
    }

    // ==================== Raw upload ====================

    /// Send raw bytes to an absolute URL (a presigned upload target) and
    /// return the status code. Non-2xx statuses are returned, not mapped.
    pub async fn upload(
        &self,
        url: &str,
        method: &str,
        headers: &HashMap<String, String>,
        body: Bytes,
    ) -> Result<u16> {
        let url = Url::parse(url).map_err(|_| ApiError::InvalidUrl)?;
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| ApiError::InvalidRequest(format!("unsupported method {}", method)))?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidRequest(format!("invalid header name {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ApiError::InvalidRequest(format!("invalid value for header {}", name)))?;
            header_map.insert(name, value);
        }

        debug!(%url, %method, bytes = body.len(), "Uploading to presigned URL");
        let response = self
            .http
            .request(method, url)
            .headers(header_map)
            .body(body)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    // ==================== Internals ====================

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> Result<T> {
        let headers = json_headers(token)?;
        let method_name = method.to_string();
        let url_text = url.to_string();
        let exchange = self
            .execute(method, url, headers.clone(), body.clone())
            .await?;

        serde_json::from_slice(&exchange.body).map_err(|e| {
            FailureRecord {
                method: &method_name,
                url: &url_text,
                request_headers: &headers,
                request_body: body.as_deref(),
                status: Some(exchange.status),
                response_headers: None,
                response_body: &exchange.body,
            }
            .log("response did not decode");
            ApiError::DecodeError(e.to_string())
        })
    }

    /// Send the request; 2xx yields the body, anything else is logged and
    /// mapped through [`ApiError::from_status`].
    async fn execute(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<Exchange> {
        let method_name = method.to_string();
        let url_text = url.to_string();

        let mut request = self.http.request(method, url).headers(headers.clone());
        if let Some(body) = body.clone() {
            request = request.body(body);
        }
        let response = request.send().await?;

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let payload = response
            .bytes()
            .await
            .map_err(|_| ApiError::InvalidResponse)?;

        if (200..300).contains(&status) {
            return Ok(Exchange {
                status,
                body: payload,
            });
        }

        FailureRecord {
            method: &method_name,
            url: &url_text,
            request_headers: &headers,
            request_body: body.as_deref(),
            status: Some(status),
            response_headers: Some(&response_headers),
            response_body: &payload,
        }
        .log("unsuccessful status");
        Err(ApiError::from_status(status, &payload))
    }
}

fn json_headers(token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidRequest("access token is not a valid header".into()))?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}
