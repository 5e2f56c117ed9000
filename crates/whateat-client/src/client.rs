//! [`WhatEatClient`]: every component wired together over one API client
//! and one secret store.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;
use whateat_net::ApiClient;
use whateat_store::{SecretStore, SqliteSecretStore};

use crate::auth::{AccessTokenProvider, AuthManager, IdentityProvider, StoredCredentialProvider};
use crate::config::ClientConfig;
use crate::editor::RecipeEditor;
use crate::home::HomeSuggestions;
use crate::recipes::RecipesApi;
use crate::saved::SavedRecipesStore;
use crate::session::spawn_session_watcher;
use crate::uploader::CoverImageUploader;

pub struct WhatEatClient {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub auth: AuthManager,
    pub saved: Arc<SavedRecipesStore>,
    pub home: Arc<HomeSuggestions>,
    pub uploader: Arc<CoverImageUploader>,
    pub recipes: RecipesApi,
    pub editor: Arc<RecipeEditor>,
    session_watcher: JoinHandle<()>,
}

impl WhatEatClient {
    /// Open the durable secret store from `config` and wire the client.
    /// Must be called inside a tokio runtime.
    pub fn open(config: ClientConfig) -> anyhow::Result<Self> {
        let secrets = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                SqliteSecretStore::open_in(dir, &config.secret_service)?
            }
            None => SqliteSecretStore::open_default(&config.secret_service)?,
        };
        Self::with_parts(config, Arc::new(secrets), Arc::new(StoredCredentialProvider))
    }

    /// Wire the client over caller-supplied secret and identity backends.
    pub fn with_parts(
        config: ClientConfig,
        secrets: Arc<dyn SecretStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> anyhow::Result<Self> {
        let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout)?;
        let auth = AuthManager::new(
            api.clone(),
            secrets,
            identity,
            config.token_refresh_window_secs,
        );
        let tokens: Arc<dyn AccessTokenProvider> = Arc::new(auth.clone());

        let saved = Arc::new(SavedRecipesStore::new(
            api.clone(),
            tokens.clone(),
            config.page_limit,
        ));
        let home = Arc::new(HomeSuggestions::new(api.clone(), tokens.clone()));
        let uploader = Arc::new(CoverImageUploader::new(
            api.clone(),
            config.max_cover_image_bytes,
        ));
        let recipes = RecipesApi::new(api.clone(), tokens.clone());
        let editor = Arc::new(RecipeEditor::new(
            recipes.clone(),
            saved.clone(),
            uploader.clone(),
            tokens,
        ));
        let session_watcher = spawn_session_watcher(auth.subscribe(), saved.clone(), home.clone());

        info!(base_url = %api.base_url(), "whatEat client ready");
        Ok(Self {
            config,
            api,
            auth,
            saved,
            home,
            uploader,
            recipes,
            editor,
            session_watcher,
        })
    }
}

impl Drop for WhatEatClient {
    fn drop(&mut self) {
        self.session_watcher.abort();
    }
}
