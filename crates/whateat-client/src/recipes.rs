//! Recipe endpoints outside the saved list: fetch, import, create, update.

use std::sync::Arc;

use tracing::info;
use whateat_net::ApiClient;
use whateat_shared::codec::{
    decode_recipe, ImportRecipeEnvelope, ImportRecipeRequest, RecipeCreateRequest,
    RecipeCreateResponse, RecipeEnvelope, RecipeUpdateRequest, RecipeUpdateResponse,
};
use whateat_shared::Recipe;

use crate::auth::AccessTokenProvider;
use crate::error::{ClientError, Result};

#[derive(Clone)]
pub struct RecipesApi {
    api: ApiClient,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl RecipesApi {
    pub fn new(api: ApiClient, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self { api, tokens }
    }

    pub async fn fetch_recipe(&self, id: &str) -> Result<Recipe> {
        let token = self.tokens.access_token().await?;
        let RecipeEnvelope(data) = self
            .api
            .get(&format!("/recipes/{}", id), &[], Some(&token))
            .await?;
        Ok(decode_recipe(&data))
    }

    /// Import a recipe from a web page.
    pub async fn import_recipe(&self, url: &str) -> Result<Recipe> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Validation("Enter a valid recipe link.".into()));
        }
        let token = self.tokens.access_token().await?;
        let request = ImportRecipeRequest {
            url: url.to_string(),
        };
        let ImportRecipeEnvelope(data) = self
            .api
            .post("/recipes/import", &request, Some(&token))
            .await?;
        let recipe = decode_recipe(&data);
        info!(recipe_id = %recipe.id, "Imported recipe");
        Ok(recipe)
    }

    pub async fn create(&self, request: &RecipeCreateRequest) -> Result<RecipeCreateResponse> {
        let token = self.tokens.access_token().await?;
        let response: RecipeCreateResponse =
            self.api.post("/recipes", request, Some(&token)).await?;
        info!(recipe_id = %response.id, "Created recipe");
        Ok(response)
    }

    pub async fn update(
        &self,
        id: &str,
        request: &RecipeUpdateRequest,
    ) -> Result<RecipeUpdateResponse> {
        let token = self.tokens.access_token().await?;
        let response: RecipeUpdateResponse = self
            .api
            .patch(&format!("/recipes/{}", id), request, Some(&token))
            .await?;
        info!(recipe_id = %response.id, "Updated recipe");
        Ok(response)
    }
}
