use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Flexible scalars
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }

    fn into_int(self) -> Option<i64> {
        match self {
            StringOrNumber::Int(i) => Some(i),
            StringOrNumber::Float(f) if f.is_finite() => Some(f.round() as i64),
            StringOrNumber::Float(_) => None,
            StringOrNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Accepts `"2"`, `2` or `2.5`, yielding their textual form.
pub(crate) fn flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

/// Ids are strings on the wire, but some endpoints hand out integers.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrNumber::deserialize(deserializer)?.into_string())
}

pub(crate) fn flexible_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_string(deserializer)
}

/// Integers that may arrive as floats or numeric strings. Unparseable
/// text becomes `None` rather than failing the whole recipe.
pub(crate) fn flexible_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.and_then(StringOrNumber::into_int))
}

// ---------------------------------------------------------------------------
// Recipe payload
// ---------------------------------------------------------------------------

/// Recipe exactly as the backend sends it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeData {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_int")]
    pub servings: Option<i64>,
    #[serde(default, deserialize_with = "flexible_int")]
    pub calories: Option<i64>,
    #[serde(default, alias = "prepTime")]
    pub prep_time: Option<String>,
    #[serde(default, alias = "cookTime")]
    pub cook_time: Option<String>,
    #[serde(default, alias = "prepTimeMinutes", deserialize_with = "flexible_int")]
    pub prep_time_minutes: Option<i64>,
    #[serde(default, alias = "cookTimeMinutes", deserialize_with = "flexible_int")]
    pub cook_time_minutes: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default, alias = "dietaryLabels")]
    pub dietary_labels: Option<Vec<String>>,
    #[serde(default)]
    pub ingredients: Option<Vec<WireIngredient>>,
    #[serde(default, alias = "instructions")]
    pub steps: Option<Vec<WireStep>>,
    #[serde(default)]
    pub media: Option<Vec<RecipeMedia>>,
    #[serde(default)]
    pub metadata: Option<RecipeMetadata>,
    #[serde(default, alias = "sourceType")]
    pub source_type: Option<String>,
    #[serde(default, alias = "isUserOwned")]
    pub is_user_owned: Option<bool>,
    #[serde(
        default,
        alias = "editableRecipeId",
        deserialize_with = "flexible_optional_id"
    )]
    pub editable_recipe_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeMedia {
    #[serde(default, alias = "mediaType")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "isGenerated")]
    pub is_generated: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeMetadata {
    #[serde(default, alias = "mealType")]
    pub meal_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Ingredients and steps
// ---------------------------------------------------------------------------

/// An ingredient is either a bare string or an object with any subset of
/// name/amount/unit/quantity/text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireIngredient {
    pub name: Option<String>,
    pub amount: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<String>,
    pub text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngredientRepr {
    Text(String),
    Fields(IngredientFields),
}

#[derive(Deserialize)]
struct IngredientFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    amount: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    unit: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    quantity: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "rawText")]
    raw_text: Option<String>,
}

impl<'de> Deserialize<'de> for WireIngredient {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match IngredientRepr::deserialize(deserializer)? {
            IngredientRepr::Text(text) => WireIngredient {
                text: Some(text),
                ..Default::default()
            },
            IngredientRepr::Fields(f) => WireIngredient {
                name: f.name,
                amount: f.amount,
                unit: f.unit,
                quantity: f.quantity,
                text: f.text.or(f.raw_text),
            },
        })
    }
}

/// A step is a bare string or an object. `order` falls back to
/// `step_number`, `description` to `detail`, `text` to `instruction`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireStep {
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: Option<String>,
    pub order: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepRepr {
    Text(String),
    Fields(StepFields),
}

#[derive(Deserialize)]
struct StepFields {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default, deserialize_with = "flexible_int")]
    order: Option<i64>,
    #[serde(default, alias = "stepNumber", deserialize_with = "flexible_int")]
    step_number: Option<i64>,
}

impl<'de> Deserialize<'de> for WireStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match StepRepr::deserialize(deserializer)? {
            StepRepr::Text(text) => WireStep {
                text: Some(text),
                ..Default::default()
            },
            StepRepr::Fields(f) => WireStep {
                title: f.title,
                description: f.description.or(f.detail),
                text: f.text.or(f.instruction),
                order: f.order.or(f.step_number),
            },
        })
    }
}
