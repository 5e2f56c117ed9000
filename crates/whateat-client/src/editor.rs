//! Recipe create/edit: a plain [`RecipeDraft`] the UI binds to, and a
//! [`RecipeEditor`] that owns the cover photo upload and the save itself.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;
use whateat_shared::codec::{
    format_minutes, parse_minutes, RecipeCreateRequest, RecipeUpdateRequest,
};
use whateat_shared::constants::SOURCE_TYPE_USER;
use whateat_shared::{Ingredient, InstructionStep, MealType, Recipe, RecipeOwnership};

use crate::auth::AccessTokenProvider;
use crate::error::{ClientError, Result};
use crate::recipes::RecipesApi;
use crate::saved::SavedRecipesStore;
use crate::uploader::CoverImageUploader;

const COVER_NOT_READY: &str = "Cover photo upload isn't finished yet. Remove it or wait to finish.";
const MISSING_FIELDS: &str = "Add a title, ingredients, instructions and a prep time.";

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// One editable ingredient or instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
    pub id: Uuid,
    pub text: String,
}

impl DraftLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub ingredients: Vec<DraftLine>,
    pub instructions: Vec<DraftLine>,
    pub prep_hours: u32,
    pub prep_minutes: u32,
    pub calories_text: String,
    pub meal_type: MealType,
    pub cover_photo_url: Option<String>,
}

impl Default for RecipeDraft {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl RecipeDraft {
    /// A blank draft with one empty ingredient and one empty instruction.
    pub fn new_empty() -> Self {
        Self {
            title: String::new(),
            ingredients: vec![DraftLine::empty()],
            instructions: vec![DraftLine::empty()],
            prep_hours: 0,
            prep_minutes: 0,
            calories_text: String::new(),
            meal_type: MealType::Other,
            cover_photo_url: None,
        }
    }

    /// Prefill from an existing recipe. Instructions use the step
    /// description, or the step title when the description is blank.
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let total = parse_minutes(&recipe.prep_time).unwrap_or(0).max(0) as u32;
        let mut ingredients: Vec<DraftLine> = recipe
            .ingredients
            .iter()
            .map(|i| DraftLine::new(i.display_text()))
            .collect();
        let mut instructions: Vec<DraftLine> = recipe
            .instructions
            .iter()
            .map(|step| {
                if step.description.trim().is_empty() {
                    DraftLine::new(step.title.clone())
                } else {
                    DraftLine::new(step.description.clone())
                }
            })
            .collect();
        if ingredients.is_empty() {
            ingredients.push(DraftLine::empty());
        }
        if instructions.is_empty() {
            instructions.push(DraftLine::empty());
        }

        Self {
            title: recipe.name.clone(),
            ingredients,
            instructions,
            prep_hours: total / 60,
            prep_minutes: total % 60,
            calories_text: recipe.calories.map(|c| c.to_string()).unwrap_or_default(),
            meal_type: recipe.meal_type,
            cover_photo_url: recipe.image_url.clone(),
        }
    }

    pub fn add_ingredient(&mut self) -> Uuid {
        let line = DraftLine::empty();
        let id = line.id;
        self.ingredients.push(line);
        id
    }

    pub fn add_instruction(&mut self) -> Uuid {
        let line = DraftLine::empty();
        let id = line.id;
        self.instructions.push(line);
        id
    }

    /// The last remaining row is never removed.
    pub fn remove_ingredient(&mut self, id: Uuid) -> bool {
        remove_line(&mut self.ingredients, id)
    }

    pub fn remove_instruction(&mut self, id: Uuid) -> bool {
        remove_line(&mut self.instructions, id)
    }

    pub fn move_instruction(&mut self, from: usize, to: usize) {
        if from >= self.instructions.len() || to >= self.instructions.len() || from == to {
            return;
        }
        let line = self.instructions.remove(from);
        self.instructions.insert(to, line);
    }

    pub fn line_mut(&mut self, id: Uuid) -> Option<&mut DraftLine> {
        self.ingredients
            .iter_mut()
            .chain(self.instructions.iter_mut())
            .find(|line| line.id == id)
    }

    pub fn total_prep_minutes(&self) -> u32 {
        self.prep_hours.saturating_mul(60).saturating_add(self.prep_minutes)
    }

    pub fn formatted_prep_time(&self) -> String {
        match self.total_prep_minutes() {
            0 => "0 min".to_string(),
            minutes => format_minutes(minutes as i64),
        }
    }

    pub fn filled_ingredients(&self) -> Vec<String> {
        filled(&self.ingredients)
    }

    pub fn filled_instructions(&self) -> Vec<String> {
        filled(&self.instructions)
    }

    pub fn has_required_fields(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.filled_ingredients().is_empty()
            && !self.filled_instructions().is_empty()
            && self.total_prep_minutes() > 0
    }

    pub fn parsed_calories(&self) -> Option<i64> {
        self.calories_text.trim().parse().ok()
    }

    /// `POST /recipes` body, encoded from the recipe this draft describes.
    pub fn create_request(&self) -> RecipeCreateRequest {
        RecipeCreateRequest::from_recipe(&self.make_recipe(""))
    }

    pub fn update_request(&self) -> RecipeUpdateRequest {
        RecipeUpdateRequest::from_recipe(&self.make_recipe(""))
    }

    /// The user-owned recipe the backend now holds under `id`.
    pub fn make_recipe(&self, id: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: self.title.trim().to_string(),
            description: String::new(),
            image_url: self
                .cover_photo_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
            calories: self.parsed_calories(),
            prep_time: self.formatted_prep_time(),
            meal_type: self.meal_type,
            ingredients: self
                .filled_ingredients()
                .into_iter()
                .map(|text| Ingredient {
                    name: text.clone(),
                    amount: None,
                    text: Some(text),
                })
                .collect(),
            instructions: self
                .filled_instructions()
                .into_iter()
                .enumerate()
                .map(|(i, text)| InstructionStep {
                    number: i as u32 + 1,
                    title: format!("Step {}", i + 1),
                    description: text,
                })
                .collect(),
            tags: Vec::new(),
            source_type: Some(SOURCE_TYPE_USER.to_string()),
            ownership: RecipeOwnership {
                is_user_owned: true,
                editable_recipe_id: Some(id.to_string()),
            },
        }
    }
}

fn filled(lines: &[DraftLine]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect()
}

fn remove_line(lines: &mut Vec<DraftLine>, id: Uuid) -> bool {
    if lines.len() <= 1 {
        return false;
    }
    let before = lines.len();
    lines.retain(|line| line.id != id);
    lines.len() != before
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// Cover photo for the recipe being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CoverPhoto {
    /// Keep whatever the draft already carries.
    #[default]
    Unchanged,
    Uploading,
    Uploaded(String),
    /// Upload failed; the chosen photo has no URL.
    Failed,
    Removed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub cover: CoverPhoto,
    pub is_saving: bool,
    pub error_message: Option<String>,
    upload_generation: u64,
}

impl EditorState {
    pub fn is_uploading_cover(&self) -> bool {
        self.cover == CoverPhoto::Uploading
    }

    /// Cover URL to persist, or an error while the chosen photo has none.
    fn resolve_cover(&self, draft_url: Option<&String>) -> Result<Option<String>> {
        match &self.cover {
            CoverPhoto::Unchanged => Ok(draft_url.cloned()),
            CoverPhoto::Uploaded(url) => Ok(Some(url.clone())),
            CoverPhoto::Removed => Ok(None),
            CoverPhoto::Uploading | CoverPhoto::Failed => {
                Err(ClientError::Validation(COVER_NOT_READY.into()))
            }
        }
    }
}

pub struct RecipeEditor {
    recipes: RecipesApi,
    saved: Arc<SavedRecipesStore>,
    uploader: Arc<CoverImageUploader>,
    tokens: Arc<dyn AccessTokenProvider>,
    state: watch::Sender<EditorState>,
    upload_task: Mutex<Option<AbortHandle>>,
}

impl RecipeEditor {
    pub fn new(
        recipes: RecipesApi,
        saved: Arc<SavedRecipesStore>,
        uploader: Arc<CoverImageUploader>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let (state, _) = watch::channel(EditorState::default());
        Self {
            recipes,
            saved,
            uploader,
            tokens,
            state,
            upload_task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<EditorState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> EditorState {
        self.state.borrow().clone()
    }

    // ==================== Cover photo ====================

    /// Start uploading a newly chosen photo, cancelling any upload already
    /// running. The returned handle completes when this upload settles.
    pub fn select_cover_photo(
        self: &Arc<Self>,
        bytes: Bytes,
        mime_type: &str,
        file_name: &str,
    ) -> JoinHandle<()> {
        self.abort_upload();
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.upload_generation += 1;
            generation = s.upload_generation;
            s.cover = CoverPhoto::Uploading;
            s.error_message = None;
        });

        let editor = Arc::clone(self);
        let mime_type = mime_type.to_string();
        let file_name = file_name.to_string();
        let handle = tokio::spawn(async move {
            let result = editor.upload(bytes, &mime_type, &file_name).await;
            editor.state.send_if_modified(|s| {
                if s.upload_generation != generation {
                    return false;
                }
                match &result {
                    Ok(url) => {
                        s.cover = CoverPhoto::Uploaded(url.clone());
                        s.error_message = None;
                    }
                    Err(e) => {
                        s.cover = CoverPhoto::Failed;
                        s.error_message = Some(e.to_string());
                    }
                }
                true
            });
            match result {
                Ok(_) => debug!(generation, "Cover photo ready"),
                Err(e) => warn!(generation, error = %e, "Cover photo upload failed"),
            }
        });

        *self.lock_upload_task() = Some(handle.abort_handle());
        handle
    }

    pub fn remove_cover_photo(&self) {
        self.abort_upload();
        self.state.send_modify(|s| {
            s.upload_generation += 1;
            s.cover = CoverPhoto::Removed;
            s.error_message = None;
        });
    }

    /// Drop any upload and return to a pristine state, e.g. when the
    /// editing screen closes.
    pub fn cancel(&self) {
        self.abort_upload();
        self.state.send_modify(|s| {
            let generation = s.upload_generation + 1;
            *s = EditorState::default();
            s.upload_generation = generation;
        });
    }

    async fn upload(&self, bytes: Bytes, mime_type: &str, file_name: &str) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(self
            .uploader
            .upload_cover_photo(bytes, mime_type, file_name, &token)
            .await?)
    }

    fn abort_upload(&self) {
        if let Some(handle) = self.lock_upload_task().take() {
            handle.abort();
        }
    }

    fn lock_upload_task(&self) -> std::sync::MutexGuard<'_, Option<AbortHandle>> {
        self.upload_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ==================== Save ====================

    /// Create a new user recipe and refresh the saved list. `Ok(None)` when
    /// another save is already running.
    pub async fn create(&self, draft: &RecipeDraft) -> Result<Option<Recipe>> {
        let Some(draft) = self.begin_save(draft)? else {
            return Ok(None);
        };

        let result = async {
            let response = self.recipes.create(&draft.create_request()).await?;
            Ok::<_, ClientError>(draft.make_recipe(&response.id))
        }
        .await;
        let recipe = self.finish_save(result)?;

        if let Err(e) = self.saved.refresh_after_recipe_mutation().await {
            warn!(error = %e, "Saved list refresh after create failed");
        }
        Ok(Some(recipe))
    }

    /// Edit `original`, first obtaining an editable copy when the user does
    /// not own it. The saved list entry is replaced in place.
    pub async fn update(&self, original: &Recipe, draft: &RecipeDraft) -> Result<Option<Recipe>> {
        let Some(draft) = self.begin_save(draft)? else {
            return Ok(None);
        };

        let result = async {
            let id = self.saved.ensure_editable_recipe_id(original).await?;
            let response = self.recipes.update(&id, &draft.update_request()).await?;
            let mut recipe = draft.make_recipe(&response.id);
            recipe.description = original.description.clone();
            recipe.tags = original.tags.clone();
            Ok::<_, ClientError>(recipe)
        }
        .await;
        let recipe = self.finish_save(result)?;

        if !self.saved.update_recipe(&recipe, Some(&original.id)) {
            debug!(recipe_id = %recipe.id, "Edited recipe is not in the saved list");
        }
        Ok(Some(recipe))
    }

    /// Validate, take the saving guard and resolve the cover URL.
    fn begin_save(&self, draft: &RecipeDraft) -> Result<Option<RecipeDraft>> {
        let mut outcome: Result<Option<RecipeDraft>> = Ok(None);
        self.state.send_if_modified(|s| {
            if s.is_saving {
                return false;
            }
            let resolved = s
                .resolve_cover(draft.cover_photo_url.as_ref())
                .and_then(|cover| {
                    if draft.has_required_fields() {
                        Ok(cover)
                    } else {
                        Err(ClientError::Validation(MISSING_FIELDS.into()))
                    }
                });
            match resolved {
                Ok(cover) => {
                    let mut ready = draft.clone();
                    ready.cover_photo_url = cover;
                    outcome = Ok(Some(ready));
                    s.is_saving = true;
                    s.error_message = None;
                }
                Err(e) => {
                    s.error_message = Some(e.to_string());
                    outcome = Err(e);
                }
            }
            true
        });
        outcome
    }

    fn finish_save(&self, result: Result<Recipe>) -> Result<Recipe> {
        self.state.send_modify(|s| {
            s.is_saving = false;
            match &result {
                Ok(_) => {
                    s.error_message = None;
                    s.cover = CoverPhoto::Unchanged;
                }
                Err(e) => s.error_message = Some(e.to_string()),
            }
        });
        if let Ok(recipe) = &result {
            info!(recipe_id = %recipe.id, "Recipe saved from editor");
        }
        result
    }
}
