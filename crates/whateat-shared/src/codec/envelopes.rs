//! Envelope unwrapping for responses whose outer shape varies between
//! backend versions. Each decoder tries the accepted shapes in a fixed
//! order and fails only when none of them match.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::models::{Pagination, SavedRecipeItem};

use super::mapper::decode_recipe;
use super::wire::{flexible_id, flexible_optional_id, RecipeData};

fn decode_at<T: DeserializeOwned>(map: &Map<String, Value>, keys: &[&str]) -> Option<T> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| T::deserialize(value).ok())
}

// ---------------------------------------------------------------------------
// Single recipe
// ---------------------------------------------------------------------------

/// `GET /recipes/{id}`: the recipe under `recipe_data` or `recipe`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeEnvelope(pub RecipeData);

impl<'de> Deserialize<'de> for RecipeEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let map = value
            .as_object()
            .ok_or_else(|| {
                D::Error::custom(CodecError::UnexpectedShape(
                    "recipe response is not an object".into(),
                ))
            })?;
        decode_at(map, &["recipe_data", "recipeData", "recipe"])
            .map(RecipeEnvelope)
            .ok_or_else(|| D::Error::custom(CodecError::MissingPayload("recipe_data or recipe")))
    }
}

/// `POST /recipes/import`: `recipe_data` first, then `save_payload.recipe`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecipeEnvelope(pub RecipeData);

impl<'de> Deserialize<'de> for ImportRecipeEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let map = value
            .as_object()
            .ok_or_else(|| {
                D::Error::custom(CodecError::UnexpectedShape(
                    "import response is not an object".into(),
                ))
            })?;
        decode_at(map, &["recipe_data", "recipeData"])
            .or_else(|| {
                map.get("save_payload")
                    .or_else(|| map.get("savePayload"))
                    .and_then(Value::as_object)
                    .and_then(|inner| decode_at(inner, &["recipe", "recipe_data"]))
            })
            .map(ImportRecipeEnvelope)
            .ok_or_else(|| D::Error::custom(CodecError::MissingPayload("recipe_data or save_payload.recipe")))
    }
}

// ---------------------------------------------------------------------------
// Saved recipe list
// ---------------------------------------------------------------------------

/// One element of the saved-recipes list.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecipePayload {
    pub id: String,
    pub saved_at: Option<String>,
    pub source_recipe_id: Option<String>,
    pub daily_plan_item_id: Option<String>,
    pub recipe: RecipeData,
}

#[derive(Deserialize)]
struct SavedRecipeFields {
    #[serde(deserialize_with = "flexible_id")]
    id: String,
    #[serde(default, alias = "savedAt", alias = "created_at")]
    saved_at: Option<String>,
    #[serde(default, alias = "sourceRecipeId", deserialize_with = "flexible_optional_id")]
    source_recipe_id: Option<String>,
    #[serde(default, alias = "dailyPlanItemId", deserialize_with = "flexible_optional_id")]
    daily_plan_item_id: Option<String>,
}

impl<'de> Deserialize<'de> for SavedRecipePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let fields = SavedRecipeFields::deserialize(&value).map_err(D::Error::custom)?;
        let recipe = value
            .as_object()
            .and_then(|map| decode_at(map, &["recipe_data", "recipeData", "recipe"]))
            .ok_or_else(|| D::Error::custom(CodecError::MissingPayload("saved recipe")))?;
        Ok(SavedRecipePayload {
            id: fields.id,
            saved_at: fields.saved_at,
            source_recipe_id: fields.source_recipe_id,
            daily_plan_item_id: fields.daily_plan_item_id,
            recipe,
        })
    }
}

impl SavedRecipePayload {
    pub fn into_item(self) -> SavedRecipeItem {
        SavedRecipeItem {
            recipe: decode_recipe(&self.recipe),
            id: self.id,
            saved_at: self.saved_at,
            source_recipe_id: self.source_recipe_id,
            daily_plan_item_id: self.daily_plan_item_id,
        }
    }
}

/// `GET /recipe-saves`. Elements that fail to decode are dropped and
/// counted in `skipped`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedRecipesResponse {
    pub recipe_saves: Vec<SavedRecipePayload>,
    pub pagination: Option<Pagination>,
    pub skipped: usize,
}

const SAVED_LIST_KEYS: [&str; 4] = ["recipe_saves", "recipeSaves", "items", "results"];
const PAGINATION_KEYS: [&str; 2] = ["pagination", "meta"];

fn lossy_list(items: &[Value]) -> (Vec<SavedRecipePayload>, usize) {
    let decoded: Vec<SavedRecipePayload> = items
        .iter()
        .filter_map(|item| SavedRecipePayload::deserialize(item).ok())
        .collect();
    let skipped = items.len() - decoded.len();
    (decoded, skipped)
}

fn list_under(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    SAVED_LIST_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
}

impl SavedRecipesResponse {
    fn from_parts(items: &[Value], pagination: Option<Pagination>) -> Self {
        let (recipe_saves, skipped) = lossy_list(items);
        Self {
            recipe_saves,
            pagination,
            skipped,
        }
    }
}

impl<'de> Deserialize<'de> for SavedRecipesResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let map = match &value {
            Value::Array(items) => return Ok(Self::from_parts(items, None)),
            Value::Object(map) => map,
            _ => {
                return Err(D::Error::custom(CodecError::UnexpectedShape(
                    "saved recipes response is not a list or object".into(),
                )))
            }
        };
        let pagination = decode_at::<Pagination>(map, &PAGINATION_KEYS);

        if let Some(items) = list_under(map) {
            return Ok(Self::from_parts(items, pagination));
        }
        match map.get("data") {
            Some(Value::Array(items)) => Ok(Self::from_parts(items, pagination)),
            Some(Value::Object(data)) => {
                let items = list_under(data)
                    .ok_or_else(|| D::Error::custom(CodecError::MissingPayload("data.recipe_saves")))?;
                let pagination = decode_at(data, &PAGINATION_KEYS).or(pagination);
                Ok(Self::from_parts(items, pagination))
            }
            _ => Err(D::Error::custom(CodecError::MissingPayload("recipe_saves"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Save response
// ---------------------------------------------------------------------------

/// `POST /recipe-saves`. Accepted flat or under `recipe_save`, `data` or
/// `data.recipe_save`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveRecipeResponse {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default, alias = "recipeId", deserialize_with = "flexible_optional_id")]
    pub recipe_id: Option<String>,
    #[serde(default, alias = "recipeTitle")]
    pub recipe_title: Option<String>,
    #[serde(default, alias = "sourceRecipeId", deserialize_with = "flexible_optional_id")]
    pub source_recipe_id: Option<String>,
    #[serde(default, alias = "dailyPlanItemId", deserialize_with = "flexible_optional_id")]
    pub daily_plan_item_id: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

impl SaveRecipeResponse {
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Ok(flat) = Self::deserialize(value) {
            return Some(flat);
        }
        let map = value.as_object()?;
        if let Some(found) = decode_at(map, &["recipe_save", "recipeSave", "data"]) {
            return Some(found);
        }
        map.get("data")
            .and_then(Value::as_object)
            .and_then(|data| decode_at(data, &["recipe_save", "recipeSave"]))
    }

    /// Id of the user-owned copy the save produced: `recipe_id`, then
    /// `source_recipe_id`, then the recipe that was saved.
    pub fn resolved_recipe_id(&self, saved_recipe_id: &str) -> String {
        self.recipe_id
            .clone()
            .or_else(|| self.source_recipe_id.clone())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| saved_recipe_id.to_string())
    }
}

/// Wrapper used when decoding over HTTP; unwraps to [`SaveRecipeResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRecipeEnvelope(pub SaveRecipeResponse);

impl<'de> Deserialize<'de> for SaveRecipeEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SaveRecipeResponse::from_value(&value)
            .map(SaveRecipeEnvelope)
            .ok_or_else(|| D::Error::custom(CodecError::MissingPayload("recipe_save")))
    }
}

// ---------------------------------------------------------------------------
// Daily suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailySuggestion {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default, alias = "userId", deserialize_with = "flexible_optional_id")]
    pub user_id: Option<String>,
    #[serde(alias = "recipeData", alias = "recipe")]
    pub recipe_data: RecipeData,
    #[serde(default, alias = "generatedAt")]
    pub generated_at: Option<String>,
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<String>,
    #[serde(default, alias = "savedRecipeId", deserialize_with = "flexible_optional_id")]
    pub saved_recipe_id: Option<String>,
    #[serde(default, alias = "runId", deserialize_with = "flexible_optional_id")]
    pub run_id: Option<String>,
    #[serde(default, alias = "triggerSource")]
    pub trigger_source: Option<String>,
    #[serde(default)]
    pub rank: Option<i64>,
}

/// Suggestions arrive either already bucketed by meal type or as a flat
/// list to be bucketed by each recipe's meal type.
#[derive(Debug, Clone, PartialEq)]
pub enum DailySuggestionsPayload {
    Buckets(BTreeMap<String, Vec<DailySuggestion>>),
    List(Vec<DailySuggestion>),
}

impl<'de> Deserialize<'de> for DailySuggestionsPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => BTreeMap::<String, Vec<DailySuggestion>>::deserialize(value)
                .map(DailySuggestionsPayload::Buckets)
                .map_err(D::Error::custom),
            value @ Value::Array(_) => Vec::<DailySuggestion>::deserialize(value)
                .map(DailySuggestionsPayload::List)
                .map_err(D::Error::custom),
            _ => Err(D::Error::custom(CodecError::UnexpectedShape(
                "suggestions are neither buckets nor a list".into(),
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyRun {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "triggerSource")]
    pub trigger_source: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

/// `GET /daily/suggestions`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailySuggestionsResponse {
    pub suggestions: DailySuggestionsPayload,
    #[serde(default)]
    pub run: Option<DailyRun>,
}

/// `GET /daily/refresh`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyRefreshResponse {
    pub suggestions: BTreeMap<String, Vec<DailySuggestion>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn saved(id: &str, recipe_id: &str) -> Value {
        json!({"id": id, "saved_at": "2026-01-01T00:00:00Z", "recipe_data": {"id": recipe_id, "title": "R"}})
    }

    #[test]
    fn test_saved_list_envelopes() {
        let shapes = vec![
            json!({"recipe_saves": [saved("s1", "r1")]}),
            json!({"recipeSaves": [saved("s1", "r1")]}),
            json!({"items": [saved("s1", "r1")]}),
            json!({"results": [saved("s1", "r1")]}),
            json!({"data": [saved("s1", "r1")]}),
            json!({"data": {"items": [saved("s1", "r1")]}}),
            json!([saved("s1", "r1")]),
        ];
        for shape in shapes {
            let decoded: SavedRecipesResponse = serde_json::from_value(shape.clone()).unwrap();
            assert_eq!(decoded.recipe_saves.len(), 1, "shape {}", shape);
            assert_eq!(decoded.recipe_saves[0].recipe.id, "r1");
        }
    }

    #[test]
    fn test_saved_list_skips_bad_elements() {
        let body = json!({
            "recipe_saves": [saved("s1", "r1"), {"id": "s2"}, saved("s3", "r3")],
            "pagination": {"page": 1, "limit": 20, "total": 2, "total_pages": 1}
        });
        let decoded: SavedRecipesResponse = serde_json::from_value(body).unwrap();
        let ids: Vec<&str> = decoded.recipe_saves.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3"]);
        assert_eq!(decoded.skipped, 1);
        assert_eq!(decoded.pagination.unwrap().total_pages, 1);
    }

    #[test]
    fn test_saved_list_pagination_under_meta_or_data() {
        let body = json!({"data": {"results": [], "meta": {"page": 2, "totalPages": 4}}});
        let decoded: SavedRecipesResponse = serde_json::from_value(body).unwrap();
        let pagination = decoded.pagination.unwrap();
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.total_pages, 4);
        assert_eq!(pagination.limit, None);
    }

    #[test]
    fn test_saved_list_rejects_unknown_shape() {
        assert!(serde_json::from_value::<SavedRecipesResponse>(json!({"nothing": 1})).is_err());
        assert!(serde_json::from_value::<SavedRecipesResponse>(json!("text")).is_err());
    }

    #[test]
    fn test_saved_payload_recipe_key_variants() {
        let payload: SavedRecipePayload = serde_json::from_value(json!({
            "id": 7, "savedAt": "x", "sourceRecipeId": "orig",
            "recipe": {"id": "copy", "name": "Stew"}
        }))
        .unwrap();
        assert_eq!(payload.id, "7");
        assert_eq!(payload.source_recipe_id.as_deref(), Some("orig"));
        let item = payload.into_item();
        assert_eq!(item.recipe.name, "Stew");
    }

    #[test]
    fn test_save_response_envelopes() {
        let flat = json!({"id": "s1", "recipe_id": "copy"});
        let wrapped = json!({"recipe_save": {"id": "s1", "recipe_id": "copy"}});
        let data = json!({"data": {"id": "s1", "recipe_id": "copy"}});
        let nested = json!({"data": {"recipe_save": {"id": "s1", "recipe_id": "copy"}}});
        for body in [flat, wrapped, data, nested] {
            let response = SaveRecipeResponse::from_value(&body).unwrap();
            assert_eq!(response.id, "s1");
            assert_eq!(response.resolved_recipe_id("orig"), "copy");
        }
        assert!(SaveRecipeResponse::from_value(&json!({"ok": true})).is_none());
    }

    #[test]
    fn test_resolved_recipe_id_fallbacks() {
        let response = SaveRecipeResponse::from_value(&json!({"id": "s", "source_recipe_id": "src"}))
            .unwrap();
        assert_eq!(response.resolved_recipe_id("orig"), "src");
        let bare = SaveRecipeResponse::from_value(&json!({"id": "s"})).unwrap();
        assert_eq!(bare.resolved_recipe_id("orig"), "orig");
    }

    #[test]
    fn test_recipe_envelopes() {
        let by_data: RecipeEnvelope =
            serde_json::from_value(json!({"recipe_data": {"id": "a", "title": "A"}})).unwrap();
        assert_eq!(by_data.0.id, "a");
        let by_recipe: RecipeEnvelope =
            serde_json::from_value(json!({"recipe_data": 5, "recipe": {"id": "b", "title": "B"}}))
                .unwrap();
        assert_eq!(by_recipe.0.id, "b");
        assert!(serde_json::from_value::<RecipeEnvelope>(json!({"other": {}})).is_err());

        let import: ImportRecipeEnvelope = serde_json::from_value(
            json!({"save_payload": {"recipe": {"id": "c", "title": "C"}}}),
        )
        .unwrap();
        assert_eq!(import.0.id, "c");
    }

    #[test]
    fn test_daily_payload_variants() {
        let suggestion = json!({"id": "dp1", "recipe_data": {"id": "r", "title": "T"}, "rank": 1});
        let buckets: DailySuggestionsResponse =
            serde_json::from_value(json!({"suggestions": {"dinner": [suggestion.clone()]}})).unwrap();
        assert!(matches!(buckets.suggestions, DailySuggestionsPayload::Buckets(ref b) if b["dinner"].len() == 1));

        let list: DailySuggestionsResponse =
            serde_json::from_value(json!({"suggestions": [suggestion], "run": {"id": 3}})).unwrap();
        assert!(matches!(list.suggestions, DailySuggestionsPayload::List(ref l) if l.len() == 1));
        assert_eq!(list.run.unwrap().id, "3");

        assert!(serde_json::from_value::<DailySuggestionsResponse>(json!({"suggestions": 1})).is_err());
    }
}
