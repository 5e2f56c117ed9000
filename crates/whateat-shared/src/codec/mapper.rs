use std::cmp::Ordering;

use crate::constants::{
    INGREDIENT_PLACEHOLDER, PREP_TIME_UNKNOWN, SOURCE_TYPE_USER, STEP_DESCRIPTION_PLACEHOLDER,
};
use crate::models::{Ingredient, InstructionStep, Recipe, RecipeOwnership};
use crate::types::MealType;

use super::wire::{RecipeData, WireIngredient, WireStep};

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// Convert a decoded wire recipe into the canonical model.
pub fn decode_recipe(data: &RecipeData) -> Recipe {
    let image_url = data
        .media
        .as_ref()
        .and_then(|media| media.iter().find_map(|m| m.url.clone()))
        .filter(|url| !url.trim().is_empty());

    let is_user_owned = data
        .is_user_owned
        .unwrap_or_else(|| data.source_type.as_deref() == Some(SOURCE_TYPE_USER));

    Recipe {
        id: data.id.clone(),
        name: data.title.clone(),
        description: data.description.clone().unwrap_or_default(),
        image_url,
        calories: data.calories,
        prep_time: format_prep_time(
            data.prep_time.as_deref(),
            data.cook_time.as_deref(),
            data.prep_time_minutes,
            data.cook_time_minutes,
        ),
        meal_type: meal_type_for(data),
        ingredients: map_ingredients(data.ingredients.as_deref().unwrap_or_default()),
        instructions: map_steps(data.steps.as_deref().unwrap_or_default()),
        tags: data.tags.clone().unwrap_or_default(),
        source_type: data.source_type.clone(),
        ownership: RecipeOwnership {
            is_user_owned,
            editable_recipe_id: data.editable_recipe_id.clone().filter(|id| !id.is_empty()),
        },
    }
}

/// `metadata.meal_type` when it names a meal, else the first tag naming a
/// meal.
pub fn meal_type_for(data: &RecipeData) -> MealType {
    if let Some(meal) = data
        .metadata
        .as_ref()
        .and_then(|m| m.meal_type.as_deref())
        .and_then(MealType::recognize)
    {
        return meal;
    }
    data.tags
        .iter()
        .flatten()
        .find_map(|tag| MealType::recognize(tag))
        .unwrap_or(MealType::Other)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Line breaks become spaces, the two dash lookalikes some scrapers
/// produce (U+00D0, U+00D1) become `-`, and runs of whitespace collapse.
pub fn normalized_text(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| match c {
            '\r' | '\n' => ' ',
            '\u{00D0}' | '\u{00D1}' => '-',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(normalized_text).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Ingredients
// ---------------------------------------------------------------------------

pub fn map_ingredients(items: &[WireIngredient]) -> Vec<Ingredient> {
    items.iter().map(map_ingredient).collect()
}

fn map_ingredient(item: &WireIngredient) -> Ingredient {
    if let Some(text) = non_empty(item.text.as_deref()) {
        return Ingredient {
            name: text.clone(),
            amount: None,
            text: Some(text),
        };
    }

    let parts: Vec<String> = [&item.quantity, &item.amount, &item.unit]
        .into_iter()
        .filter_map(|part| non_empty(part.as_deref()))
        .collect();
    let amount = (!parts.is_empty()).then(|| parts.join(" "));

    match (non_empty(item.name.as_deref()), amount) {
        (Some(name), amount) => Ingredient {
            name,
            amount,
            text: None,
        },
        // Only a measurement: show it verbatim.
        (None, Some(amount)) => Ingredient {
            name: INGREDIENT_PLACEHOLDER.to_string(),
            amount: None,
            text: Some(amount),
        },
        (None, None) => Ingredient::named(INGREDIENT_PLACEHOLDER),
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Sort by `order` (input position breaks ties, orderless steps last) and
/// renumber densely from 1.
pub fn map_steps(steps: &[WireStep]) -> Vec<InstructionStep> {
    let mut indexed: Vec<(usize, &WireStep)> = steps.iter().enumerate().collect();
    indexed.sort_by(|(ai, a), (bi, b)| match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y).then(ai.cmp(bi)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => ai.cmp(bi),
    });

    indexed
        .into_iter()
        .enumerate()
        .map(|(position, (_, step))| {
            let number = position as u32 + 1;
            InstructionStep {
                number,
                title: non_empty(step.title.as_deref()).unwrap_or_else(|| format!("Step {}", number)),
                description: non_empty(step.description.as_deref())
                    .or_else(|| non_empty(step.text.as_deref()))
                    .unwrap_or_else(|| STEP_DESCRIPTION_PLACEHOLDER.to_string()),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Times
// ---------------------------------------------------------------------------

/// First non-empty of: prep text, cook text, formatted prep+cook minutes,
/// formatted prep minutes, formatted cook minutes, `"N/A"`.
pub fn format_prep_time(
    prep_time: Option<&str>,
    cook_time: Option<&str>,
    prep_minutes: Option<i64>,
    cook_minutes: Option<i64>,
) -> String {
    if let Some(text) = non_empty(prep_time).or_else(|| non_empty(cook_time)) {
        return text;
    }
    match (prep_minutes, cook_minutes) {
        (Some(prep), Some(cook)) => format_minutes(prep + cook),
        (Some(minutes), None) | (None, Some(minutes)) => format_minutes(minutes),
        (None, None) => PREP_TIME_UNKNOWN.to_string(),
    }
}

pub fn format_minutes(minutes: i64) -> String {
    if minutes <= 0 {
        return PREP_TIME_UNKNOWN.to_string();
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Inverse of [`format_minutes`] for user-entered text: `"1h 10m"`,
/// `"25 min"`, `"2 hours"` or a bare number. `None` for `"N/A"` and for
/// anything that does not yield a positive total.
pub fn parse_minutes(value: &str) -> Option<i64> {
    let lowered = value.trim().to_lowercase();
    if lowered.is_empty() || lowered.contains("n/a") {
        return None;
    }

    let mut hours: Option<i64> = None;
    let mut minutes: Option<i64> = None;
    let chars: Vec<char> = lowered.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let digits: String = chars[start..i].iter().collect();
        let mut j = i;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        let Ok(number) = digits.parse::<i64>() else {
            continue;
        };
        match chars.get(j) {
            Some('h') if hours.is_none() => hours = Some(number),
            Some('m') if minutes.is_none() => minutes = Some(number),
            _ => {}
        }
    }

    let total = hours.unwrap_or(0) * 60 + minutes.unwrap_or(0);
    if total > 0 {
        return Some(total);
    }
    lowered.parse::<i64>().ok().filter(|m| *m > 0)
}
