use serde::{Deserialize, Serialize};

/// Meal category a recipe or suggestion belongs to.
///
/// Ordering follows the day: breakfast first, anything unrecognized last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Dessert,
    Other,
}

impl MealType {
    pub const ALL: [MealType; 5] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Dessert,
        MealType::Other,
    ];

    /// Case-insensitive match against the backend's meal type strings.
    /// Unknown values map to `Other`.
    pub fn from_api_value(value: &str) -> Self {
        Self::recognize(value).unwrap_or(MealType::Other)
    }

    /// Like `from_api_value`, but `None` for anything that is not one of the
    /// four named meals. Used when scanning tags.
    pub fn recognize(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "dessert" => Some(MealType::Dessert),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Dessert => "dessert",
            MealType::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Dessert => "Dessert",
            MealType::Other => "Other",
        }
    }
}

impl Default for MealType {
    fn default() -> Self {
        MealType::Other
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where a save originated. Serialized into the `source_type`/`source_id`
/// pair of a save request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SaveSource {
    DailyPlanItem(String),
    Recipe(String),
    Share(String),
}

impl SaveSource {
    pub fn source_type(&self) -> &'static str {
        match self {
            SaveSource::DailyPlanItem(_) => "daily_plan_item",
            SaveSource::Recipe(_) => "recipe",
            SaveSource::Share(_) => "share",
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            SaveSource::DailyPlanItem(id) | SaveSource::Recipe(id) | SaveSource::Share(id) => id,
        }
    }
}
