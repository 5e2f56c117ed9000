use serde::{Deserialize, Serialize};

use crate::codec::normalized_text;
use crate::types::MealType;

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// A single ingredient line as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: Option<String>,
    /// Free text that, when present, replaces the name/amount rendering.
    pub text: Option<String>,
}

impl Ingredient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: None,
            text: None,
        }
    }

    /// `text` if non-empty, otherwise `"{amount} {name}"`, otherwise `name`.
    pub fn display_text(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return text.to_string();
        }
        match self.amount.as_deref().filter(|a| !a.trim().is_empty()) {
            Some(amount) => format!("{} {}", amount, self.name),
            None => self.name.clone(),
        }
    }

    /// Stable key for per-recipe checklist state.
    pub fn cache_key(&self) -> String {
        normalized_text(&self.display_text()).to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStep {
    /// 1-based, dense
    pub number: u32,
    pub title: String,
    pub description: String,
}

/// Who may edit a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeOwnership {
    pub is_user_owned: bool,
    /// Id of a user-owned copy that may be edited instead of this recipe.
    pub editable_recipe_id: Option<String>,
}

/// Canonical recipe, independent of the envelope it was decoded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub calories: Option<i64>,
    /// Human readable, e.g. `"1h 10m"`, `"25 min"` or `"N/A"`.
    pub prep_time: String,
    pub meal_type: MealType,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<InstructionStep>,
    pub tags: Vec<String>,
    pub source_type: Option<String>,
    pub ownership: RecipeOwnership,
}

impl Recipe {
    pub fn is_user_owned(&self) -> bool {
        self.ownership.is_user_owned
    }

    pub fn editable_recipe_id(&self) -> Option<&str> {
        self.ownership
            .editable_recipe_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Saved recipes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipeItem {
    /// Server save-record id, used for deletion
    pub id: String,
    pub recipe: Recipe,
    pub saved_at: Option<String>,
    pub source_recipe_id: Option<String>,
    pub daily_plan_item_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(alias = "total_pages")]
    pub total_pages: u32,
}

// ---------------------------------------------------------------------------
// Home
// ---------------------------------------------------------------------------

/// One entry of the daily suggestion buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSuggestion {
    /// Daily plan item id; saving uses it as the `daily_plan_item` source.
    pub id: String,
    pub recipe: Recipe,
    pub rank: Option<i64>,
}
