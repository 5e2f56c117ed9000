//! Saved recipes: paginated list, bookmark toggling, editable copies and
//! per-recipe ingredient checklists.
//!
//! The list is held in a [`watch`] channel. Every mutation happens inside
//! `send_modify`/`send_if_modified`, so the id index is rebuilt in the same
//! step as the list it indexes and no lock is ever held across a request.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use whateat_net::ApiClient;
use whateat_shared::codec::{SaveRecipeEnvelope, SaveRecipeRequest, SavedRecipesResponse};
use whateat_shared::constants::SOURCE_TYPE_USER;
use whateat_shared::{Ingredient, Pagination, Recipe, RecipeOwnership, SaveSource, SavedRecipeItem};

use crate::auth::AccessTokenProvider;
use crate::error::{ClientError, Result};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Observable snapshot of the saved-recipes list.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecipesState {
    pub saved_recipes: Vec<SavedRecipeItem>,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub is_bookmark_busy: bool,
    pub has_loaded: bool,
    pub error_message: Option<String>,
    pub pagination: Option<Pagination>,
    pub current_page: u32,
    pub page_limit: u32,
    reached_end_without_pagination: bool,
    /// recipe id (saved copy and source) -> save id
    save_ids: HashMap<String, String>,
    /// recipe id -> checked ingredient cache keys
    checked_ingredients: HashMap<String, HashSet<String>>,
    /// Bumped by `reset`; responses from an older generation are dropped.
    generation: u64,
}

impl SavedRecipesState {
    fn new(page_limit: u32) -> Self {
        Self {
            saved_recipes: Vec::new(),
            is_loading: false,
            is_loading_more: false,
            is_bookmark_busy: false,
            has_loaded: false,
            error_message: None,
            pagination: None,
            current_page: 1,
            page_limit,
            reached_end_without_pagination: false,
            save_ids: HashMap::new(),
            checked_ingredients: HashMap::new(),
            generation: 0,
        }
    }

    pub fn is_saved(&self, recipe_id: &str) -> bool {
        self.save_ids.contains_key(recipe_id)
    }

    pub fn save_id(&self, recipe_id: &str) -> Option<&str> {
        self.save_ids.get(recipe_id).map(String::as_str)
    }

    /// Server pagination decides when present; otherwise a short page
    /// marks the end, and a full page means there may be more.
    pub fn can_load_more(&self) -> bool {
        if let Some(pagination) = self.pagination {
            return pagination.page < pagination.total_pages;
        }
        if self.reached_end_without_pagination {
            return false;
        }
        !self.saved_recipes.is_empty() && self.saved_recipes.len() >= self.page_limit as usize
    }

    pub fn is_ingredient_checked(&self, recipe_id: &str, ingredient: &Ingredient) -> bool {
        self.checked_ingredients
            .get(recipe_id)
            .is_some_and(|keys| keys.contains(&ingredient.cache_key()))
    }

    fn rebuild_index(&mut self) {
        self.save_ids.clear();
        for item in &self.saved_recipes {
            self.save_ids.insert(item.recipe.id.clone(), item.id.clone());
            if let Some(source) = item.source_recipe_id.as_ref().filter(|s| !s.is_empty()) {
                self.save_ids
                    .entry(source.clone())
                    .or_insert_with(|| item.id.clone());
            }
        }
    }

    /// Insert at the top, replacing any item with the same save id.
    fn upsert_front(&mut self, item: SavedRecipeItem) {
        self.saved_recipes.retain(|existing| existing.id != item.id);
        self.saved_recipes.insert(0, item);
        self.rebuild_index();
    }

    /// Append, skipping save ids already present.
    fn append_page(&mut self, items: Vec<SavedRecipeItem>) {
        let mut seen: HashSet<String> = self.saved_recipes.iter().map(|i| i.id.clone()).collect();
        for item in items {
            if seen.insert(item.id.clone()) {
                self.saved_recipes.push(item);
            }
        }
        self.rebuild_index();
    }

    fn remove_save(&mut self, save_id: &str) {
        self.saved_recipes.retain(|item| item.id != save_id);
        self.rebuild_index();
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct SavedRecipesStore {
    api: ApiClient,
    tokens: Arc<dyn AccessTokenProvider>,
    default_limit: u32,
    state: watch::Sender<SavedRecipesState>,
}

impl SavedRecipesStore {
    pub fn new(api: ApiClient, tokens: Arc<dyn AccessTokenProvider>, default_limit: u32) -> Self {
        let (state, _) = watch::channel(SavedRecipesState::new(default_limit));
        Self {
            api,
            tokens,
            default_limit,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SavedRecipesState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SavedRecipesState {
        self.state.borrow().clone()
    }

    pub fn is_saved(&self, recipe_id: &str) -> bool {
        self.state.borrow().is_saved(recipe_id)
    }

    pub fn save_id(&self, recipe_id: &str) -> Option<String> {
        self.state.borrow().save_id(recipe_id).map(str::to_string)
    }

    pub fn can_load_more(&self) -> bool {
        self.state.borrow().can_load_more()
    }

    // ==================== Loading ====================

    pub async fn load_saved_recipes_if_needed(&self) -> Result<()> {
        if self.state.borrow().has_loaded {
            return Ok(());
        }
        self.load_saved_recipes(1, self.default_limit, false).await
    }

    /// Load one page. Page 1 replaces the list, later pages append. A call
    /// that overlaps one already in flight for the same kind is a no-op.
    pub async fn load_saved_recipes(&self, page: u32, limit: u32, force: bool) -> Result<()> {
        let first_page = page <= 1;
        let Some(generation) = self.begin_load(first_page, force) else {
            return Ok(());
        };

        let result = self.fetch_page(page.max(1), limit).await;

        self.state.send_modify(|s| {
            if first_page {
                s.is_loading = false;
            } else {
                s.is_loading_more = false;
            }
            if s.generation != generation {
                return;
            }
            match &result {
                Ok(response) => {
                    let items: Vec<SavedRecipeItem> = response
                        .recipe_saves
                        .iter()
                        .cloned()
                        .map(|payload| payload.into_item())
                        .collect();
                    let count = items.len();
                    if first_page {
                        s.saved_recipes.clear();
                    }
                    s.append_page(items);
                    s.pagination = response.pagination;
                    s.current_page = response.pagination.map(|p| p.page).unwrap_or(page.max(1));
                    s.page_limit = response
                        .pagination
                        .and_then(|p| p.limit)
                        .filter(|l| *l > 0)
                        .unwrap_or(limit);
                    s.reached_end_without_pagination =
                        response.pagination.is_none() && count < limit as usize;
                    s.error_message = None;
                    if first_page {
                        s.has_loaded = true;
                    }
                }
                Err(e) => s.error_message = Some(e.to_string()),
            }
        });

        let response = result?;
        if response.skipped > 0 {
            warn!(skipped = response.skipped, page, "Dropped undecodable saved recipes");
        }
        debug!(page, count = response.recipe_saves.len(), "Loaded saved recipes");
        Ok(())
    }

    /// Next page, if there is one and nothing is loading.
    pub async fn load_more_saved_recipes(&self) -> Result<()> {
        let (can_load, busy, next, limit) = {
            let s = self.state.borrow();
            (
                s.can_load_more(),
                s.is_loading || s.is_loading_more,
                s.current_page + 1,
                s.page_limit,
            )
        };
        if !can_load || busy {
            return Ok(());
        }
        self.load_saved_recipes(next, limit, true).await
    }

    /// Reload page 1 after a recipe was created or edited elsewhere.
    pub async fn refresh_after_recipe_mutation(&self) -> Result<()> {
        let limit = self.state.borrow().page_limit;
        self.load_saved_recipes(1, limit, true).await
    }

    fn begin_load(&self, first_page: bool, force: bool) -> Option<u64> {
        let mut generation = None;
        self.state.send_if_modified(|s| {
            if first_page {
                if s.is_loading || (s.has_loaded && !force) {
                    return false;
                }
                s.is_loading = true;
            } else {
                if s.is_loading || s.is_loading_more {
                    return false;
                }
                s.is_loading_more = true;
            }
            generation = Some(s.generation);
            true
        });
        generation
    }

    async fn fetch_page(&self, page: u32, limit: u32) -> Result<SavedRecipesResponse> {
        let token = self.tokens.access_token().await?;
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        Ok(self
            .api
            .get::<SavedRecipesResponse>("/recipe-saves", &query, Some(&token))
            .await?)
    }

    // ==================== Bookmarks ====================

    /// Save a recipe. Already-saved recipes and calls made while another
    /// bookmark request is running are no-ops. A 409 means the server
    /// already has it: the list is reloaded instead of failing.
    pub async fn save(&self, recipe: &Recipe, source: SaveSource) -> Result<()> {
        if self.is_saved(&recipe.id) {
            return Ok(());
        }
        let Some(generation) = self.acquire_bookmark() else {
            debug!(recipe_id = %recipe.id, "Bookmark busy, ignoring save");
            return Ok(());
        };

        let result = self.perform_save(recipe, &source, generation).await;
        self.release_bookmark();

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.status() == Some(409) => {
                info!(recipe_id = %recipe.id, "Recipe already saved, reconciling");
                self.load_saved_recipes(1, self.default_limit, true).await
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Remove a saved recipe. A 404 means it is already gone server-side.
    pub async fn unsave(&self, recipe: &Recipe) -> Result<()> {
        let Some(save_id) = self.save_id(&recipe.id) else {
            return Ok(());
        };
        let Some(generation) = self.acquire_bookmark() else {
            debug!(recipe_id = %recipe.id, "Bookmark busy, ignoring unsave");
            return Ok(());
        };

        let result = self.delete_save(&save_id).await;

        let outcome = match result {
            Ok(()) => Ok(()),
            Err(e) if e.status() == Some(404) => {
                info!(%save_id, "Save already removed on server");
                Ok(())
            }
            Err(e) => Err(e),
        };

        self.state.send_modify(|s| {
            s.is_bookmark_busy = false;
            if s.generation != generation {
                return;
            }
            match &outcome {
                Ok(()) => {
                    s.remove_save(&save_id);
                    s.error_message = None;
                }
                Err(e) => s.error_message = Some(e.to_string()),
            }
        });
        outcome
    }

    async fn delete_save(&self, save_id: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        Ok(self
            .api
            .delete(&format!("/recipe-saves/{}", save_id), Some(&token))
            .await?)
    }

    fn acquire_bookmark(&self) -> Option<u64> {
        let mut generation = None;
        self.state.send_if_modified(|s| {
            if s.is_bookmark_busy {
                return false;
            }
            s.is_bookmark_busy = true;
            generation = Some(s.generation);
            true
        });
        generation
    }

    fn release_bookmark(&self) {
        self.state.send_if_modified(|s| {
            let was_busy = s.is_bookmark_busy;
            s.is_bookmark_busy = false;
            was_busy
        });
    }

    fn record_error(&self, err: &ClientError) {
        let message = err.to_string();
        self.state.send_modify(|s| s.error_message = Some(message));
    }

    /// POST the save and insert the user-owned copy at the top of the
    /// list. Returns the copy's recipe id.
    async fn perform_save(
        &self,
        recipe: &Recipe,
        source: &SaveSource,
        generation: u64,
    ) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let request = SaveRecipeRequest::from(source);
        let SaveRecipeEnvelope(response) = self
            .api
            .post::<SaveRecipeEnvelope, _>("/recipe-saves", &request, Some(&token))
            .await?;

        let resolved_id = response.resolved_recipe_id(&recipe.id);
        let mut saved_recipe = recipe.clone();
        saved_recipe.id = resolved_id.clone();
        saved_recipe.source_type = Some(SOURCE_TYPE_USER.to_string());
        saved_recipe.ownership = RecipeOwnership {
            is_user_owned: true,
            editable_recipe_id: Some(resolved_id.clone()),
        };

        let item = SavedRecipeItem {
            id: response.id.clone(),
            recipe: saved_recipe,
            saved_at: response.created_at.clone(),
            source_recipe_id: response
                .source_recipe_id
                .clone()
                .or_else(|| Some(recipe.id.clone())),
            daily_plan_item_id: response.daily_plan_item_id.clone(),
        };

        self.state.send_modify(|s| {
            if s.generation != generation {
                return;
            }
            s.upsert_front(item);
            s.error_message = None;
        });
        info!(recipe_id = %recipe.id, save_id = %response.id, "Saved recipe");
        Ok(resolved_id)
    }

    // ==================== Editable copies ====================

    /// Id of a recipe the user may edit: the recipe itself when owned,
    /// its known editable copy, or a copy created by saving it now. The
    /// implicit save ignores the bookmark guard.
    pub async fn ensure_editable_recipe_id(&self, recipe: &Recipe) -> Result<String> {
        if recipe.is_user_owned() {
            return Ok(recipe.id.clone());
        }
        if let Some(id) = recipe.editable_recipe_id() {
            return Ok(id.to_string());
        }
        if let Some(id) = self.copy_of(&recipe.id) {
            return Ok(id);
        }

        let generation = self.state.borrow().generation;
        let source = SaveSource::Recipe(recipe.id.clone());
        match self.perform_save(recipe, &source, generation).await {
            Ok(id) => Ok(id),
            Err(e) if e.status() == Some(409) => {
                info!(recipe_id = %recipe.id, "Copy already exists, reloading to find it");
                self.load_saved_recipes(1, self.default_limit, true).await?;
                self.copy_of(&recipe.id).ok_or(e)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    fn copy_of(&self, source_recipe_id: &str) -> Option<String> {
        self.state
            .borrow()
            .saved_recipes
            .iter()
            .find(|item| item.source_recipe_id.as_deref() == Some(source_recipe_id))
            .map(|item| item.recipe.id.clone())
    }

    /// Replace the recipe inside the matching saved item, matched by
    /// recipe id or else by `source_recipe_id`. Returns whether an item
    /// was updated.
    pub fn update_recipe(&self, updated: &Recipe, source_recipe_id: Option<&str>) -> bool {
        self.state.send_if_modified(|s| {
            let position = s
                .saved_recipes
                .iter()
                .position(|item| item.recipe.id == updated.id)
                .or_else(|| {
                    source_recipe_id.and_then(|source| {
                        s.saved_recipes
                            .iter()
                            .position(|item| item.source_recipe_id.as_deref() == Some(source))
                    })
                });
            let Some(index) = position else {
                return false;
            };
            s.saved_recipes[index].recipe = updated.clone();
            s.rebuild_index();
            true
        })
    }

    // ==================== Ingredient checklist ====================

    pub fn toggle_ingredient_check(&self, recipe_id: &str, ingredient: &Ingredient) {
        let key = ingredient.cache_key();
        self.state.send_modify(|s| {
            let keys = s.checked_ingredients.entry(recipe_id.to_string()).or_default();
            if !keys.remove(&key) {
                keys.insert(key);
            }
        });
    }

    pub fn is_ingredient_checked(&self, recipe_id: &str, ingredient: &Ingredient) -> bool {
        self.state.borrow().is_ingredient_checked(recipe_id, ingredient)
    }

    pub fn reset_ingredient_checks(&self, recipe_id: &str) {
        self.state.send_if_modified(|s| s.checked_ingredients.remove(recipe_id).is_some());
    }

    // ==================== Session ====================

    /// Drop everything. Requests still in flight finish but their results
    /// are discarded.
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            let generation = s.generation + 1;
            *s = SavedRecipesState::new(self.default_limit);
            s.generation = generation;
        });
        debug!("Saved recipes reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whateat_shared::MealType;

    fn recipe(id: &str) -> Recipe {
        Recipe {
            id: id.into(),
            name: format!("Recipe {}", id),
            description: String::new(),
            image_url: None,
            calories: None,
            prep_time: "N/A".into(),
            meal_type: MealType::Dinner,
            ingredients: vec![],
            instructions: vec![],
            tags: vec![],
            source_type: None,
            ownership: RecipeOwnership::default(),
        }
    }

    fn item(save_id: &str, recipe_id: &str, source: Option<&str>) -> SavedRecipeItem {
        SavedRecipeItem {
            id: save_id.into(),
            recipe: recipe(recipe_id),
            saved_at: None,
            source_recipe_id: source.map(str::to_string),
            daily_plan_item_id: None,
        }
    }

    #[test]
    fn test_index_tracks_copy_and_source() {
        let mut state = SavedRecipesState::new(20);
        state.append_page(vec![item("s1", "copy-1", Some("orig-1"))]);

        assert_eq!(state.save_id("copy-1"), Some("s1"));
        assert_eq!(state.save_id("orig-1"), Some("s1"));
        assert!(!state.is_saved("other"));

        state.remove_save("s1");
        assert!(!state.is_saved("copy-1"));
        assert!(!state.is_saved("orig-1"));
    }

    #[test]
    fn test_no_duplicate_save_ids() {
        let mut state = SavedRecipesState::new(20);
        state.append_page(vec![item("s1", "a", None), item("s1", "a", None)]);
        state.append_page(vec![item("s1", "a", None), item("s2", "b", None)]);
        state.upsert_front(item("s2", "b2", None));

        let ids: Vec<&str> = state.saved_recipes.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
        assert_eq!(state.save_id("b2"), Some("s2"));
        assert!(!state.is_saved("b"));
    }

    #[test]
    fn test_can_load_more_rules() {
        let mut state = SavedRecipesState::new(2);
        assert!(!state.can_load_more());

        state.append_page(vec![item("s1", "a", None), item("s2", "b", None)]);
        assert!(state.can_load_more());

        state.reached_end_without_pagination = true;
        assert!(!state.can_load_more());

        state.pagination = Some(Pagination {
            page: 1,
            limit: Some(2),
            total: Some(5),
            total_pages: 3,
        });
        assert!(state.can_load_more());

        state.pagination = Some(Pagination {
            page: 3,
            limit: Some(2),
            total: Some(5),
            total_pages: 3,
        });
        assert!(!state.can_load_more());
    }

    #[test]
    fn test_ingredient_checks_use_cache_key() {
        let mut state = SavedRecipesState::new(20);
        let ingredient = Ingredient {
            name: "Salt".into(),
            amount: Some("1 tsp".into()),
            text: None,
        };
        state
            .checked_ingredients
            .entry("r".into())
            .or_default()
            .insert("1 tsp salt".into());
        assert!(state.is_ingredient_checked("r", &ingredient));
        assert!(!state.is_ingredient_checked("other", &ingredient));
    }
}
