#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use whateat_client::{AccessTokenProvider, AuthError};
use whateat_net::ApiClient;
use wiremock::MockServer;

pub const TOKEN: &str = "test-access-token";

/// Always hands out [`TOKEN`].
pub struct StaticToken;

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(TOKEN.to_string())
    }
}

pub fn tokens() -> Arc<dyn AccessTokenProvider> {
    Arc::new(StaticToken)
}

pub fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(format!("{}/api/v1", server.uri()), Duration::from_secs(5)).unwrap()
}

pub fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}

pub fn recipe_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "ingredients": [{"raw_text": "1 egg"}],
        "steps": [{"instruction": "Cook", "order": 1}]
    })
}

pub fn saved_json(save_id: &str, recipe_id: &str, source: Option<&str>) -> Value {
    json!({
        "id": save_id,
        "saved_at": "2026-01-01T00:00:00Z",
        "source_recipe_id": source,
        "recipe_data": recipe_json(recipe_id, &format!("Recipe {}", recipe_id))
    })
}
