use serde::{Deserialize, Serialize};

use crate::constants::{COVER_PHOTO_MEDIA_NAME, COVER_PHOTO_MEDIA_TYPE};
use crate::models::Recipe;
use crate::types::{MealType, SaveSource};

use super::mapper::parse_minutes;
use super::wire::flexible_id;

// ---------------------------------------------------------------------------
// Recipe create / update
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientPayload {
    pub raw_text: String,
}

impl RecipeIngredientPayload {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeStepPayload {
    pub instruction: String,
    /// Dense, 1-based
    pub order: u32,
}

/// Number non-empty instruction texts densely from 1.
pub fn step_payloads<I, S>(instructions: I) -> Vec<RecipeStepPayload>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    instructions
        .into_iter()
        .map(Into::into)
        .filter(|text: &String| !text.trim().is_empty())
        .enumerate()
        .map(|(i, instruction)| RecipeStepPayload {
            instruction,
            order: i as u32 + 1,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeMediaPayload {
    pub media_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RecipeMediaPayload {
    pub fn cover_photo(url: impl Into<String>) -> Self {
        Self {
            media_type: COVER_PHOTO_MEDIA_TYPE.to_string(),
            url: url.into(),
            name: Some(COVER_PHOTO_MEDIA_NAME.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeMetadataPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
}

impl RecipeMetadataPayload {
    /// `None` for `Other`, which the backend represents by omission.
    pub fn for_meal(meal_type: MealType) -> Option<Self> {
        (meal_type != MealType::Other).then(|| Self {
            meal_type: Some(meal_type.as_str().to_string()),
        })
    }
}

/// Body of `POST /recipes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipeCreateRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_labels: Option<Vec<String>>,
    pub ingredients: Vec<RecipeIngredientPayload>,
    pub steps: Vec<RecipeStepPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<RecipeMediaPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecipeMetadataPayload>,
}

/// Body of `PATCH /recipes/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipeUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<RecipeIngredientPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<RecipeStepPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<RecipeMediaPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecipeMetadataPayload>,
}

impl RecipeCreateRequest {
    /// Re-encode a canonical recipe. Ingredients are sent as their display
    /// text, the only form that survives decoding.
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let description = recipe.description.trim();
        Self {
            title: recipe.name.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            calories: recipe.calories,
            prep_time_minutes: parse_minutes(&recipe.prep_time),
            tags: (!recipe.tags.is_empty()).then(|| recipe.tags.clone()),
            ingredients: ingredient_payloads(recipe),
            steps: step_payloads(recipe.instructions.iter().map(|step| {
                if step.description.trim().is_empty() {
                    step.title.clone()
                } else {
                    step.description.clone()
                }
            })),
            media: recipe
                .image_url
                .as_ref()
                .map(|url| vec![RecipeMediaPayload::cover_photo(url.clone())]),
            metadata: RecipeMetadataPayload::for_meal(recipe.meal_type),
            ..Default::default()
        }
    }
}

impl RecipeUpdateRequest {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let create = RecipeCreateRequest::from_recipe(recipe);
        Self {
            title: Some(create.title),
            description: create.description,
            calories: create.calories,
            prep_time_minutes: create.prep_time_minutes,
            tags: create.tags,
            ingredients: Some(create.ingredients),
            steps: Some(create.steps),
            media: create.media,
            metadata: create.metadata,
            ..Default::default()
        }
    }
}

fn ingredient_payloads(recipe: &Recipe) -> Vec<RecipeIngredientPayload> {
    recipe
        .ingredients
        .iter()
        .map(|i| i.display_text())
        .filter(|text| !text.trim().is_empty())
        .map(RecipeIngredientPayload::new)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecipeCreateResponse {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecipeUpdateResponse {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Saves and imports
// ---------------------------------------------------------------------------

/// Body of `POST /recipe-saves`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveRecipeRequest {
    pub source_type: String,
    pub source_id: String,
}

impl From<&SaveSource> for SaveRecipeRequest {
    fn from(source: &SaveSource) -> Self {
        Self {
            source_type: source.source_type().to_string(),
            source_id: source.source_id().to_string(),
        }
    }
}

/// Body of `POST /recipes/import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRecipeRequest {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_recipe, RecipeData};

    #[test]
    fn test_save_request_shape() {
        let body = serde_json::to_value(SaveRecipeRequest::from(&SaveSource::Recipe("r-1".into())))
            .unwrap();
        assert_eq!(body, serde_json::json!({"source_type": "recipe", "source_id": "r-1"}));
    }

    #[test]
    fn test_create_request_omits_absent_fields() {
        let request = RecipeCreateRequest {
            title: "Toast".into(),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"title": "Toast", "ingredients": [], "steps": []})
        );
    }

    #[test]
    fn test_recipe_reencodes_to_equivalent_payload() {
        let payload = serde_json::json!({
            "id": "r-9",
            "title": "Pancakes",
            "description": "Fluffy",
            "calories": 420,
            "prep_time_minutes": 25,
            "tags": ["breakfast"],
            "ingredients": [{"raw_text": "2 cups flour"}, {"raw_text": "1 egg"}],
            "steps": [{"order": 1, "instruction": "Mix"}, {"order": 2, "instruction": "Fry"}],
            "media": [{"media_type": "image", "url": "https://cdn/p.jpg", "name": "Cover photo"}],
            "metadata": {"meal_type": "breakfast"}
        });
        let data: RecipeData = serde_json::from_value(payload.clone()).unwrap();
        let recipe = decode_recipe(&data);
        let reencoded = serde_json::to_value(RecipeCreateRequest::from_recipe(&recipe)).unwrap();

        let mut expected = payload;
        expected.as_object_mut().unwrap().remove("id");
        assert_eq!(reencoded, expected);
    }

    #[test]
    fn test_update_request_carries_cover_media() {
        let data: RecipeData = serde_json::from_value(serde_json::json!({
            "id": "r", "title": " Soup ", "media": [{"url": "https://cdn/s.png"}]
        }))
        .unwrap();
        let update = RecipeUpdateRequest::from_recipe(&decode_recipe(&data));
        assert_eq!(update.title.as_deref(), Some("Soup"));
        let media = update.media.unwrap();
        assert_eq!(media[0].media_type, "image");
        assert_eq!(media[0].name.as_deref(), Some("Cover photo"));
        assert!(update.metadata.is_none());
    }
}
