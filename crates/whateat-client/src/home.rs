//! Daily meal suggestions grouped by meal type.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};
use whateat_net::ApiClient;
use whateat_shared::codec::{
    decode_recipe, DailyRefreshResponse, DailySuggestion, DailySuggestionsPayload,
    DailySuggestionsResponse,
};
use whateat_shared::constants::{MAX_COUNT_PER_MEAL, MIN_COUNT_PER_MEAL};
use whateat_shared::{HomeSuggestion, MealType};

use crate::auth::AccessTokenProvider;
use crate::error::Result;

/// Suggestions per meal, each bucket ordered by rank then id.
pub type SuggestionBuckets = BTreeMap<MealType, Vec<HomeSuggestion>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeState {
    pub suggestions_by_meal: SuggestionBuckets,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub has_loaded: bool,
    pub error_message: Option<String>,
    generation: u64,
}

impl HomeState {
    pub fn suggestions(&self, meal: MealType) -> &[HomeSuggestion] {
        self.suggestions_by_meal
            .get(&meal)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn to_suggestion(item: DailySuggestion) -> HomeSuggestion {
    HomeSuggestion {
        recipe: decode_recipe(&item.recipe_data),
        id: item.id,
        rank: item.rank,
    }
}

fn sort_bucket(bucket: &mut [HomeSuggestion]) {
    bucket.sort_by(|a, b| {
        a.rank
            .unwrap_or(i64::MAX)
            .cmp(&b.rank.unwrap_or(i64::MAX))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Bucket keys are meal type strings; keys naming the same meal merge.
/// Each recipe takes the meal type of the bucket it arrived in.
pub fn group_buckets(buckets: BTreeMap<String, Vec<DailySuggestion>>) -> SuggestionBuckets {
    let mut grouped = SuggestionBuckets::new();
    for (key, items) in buckets {
        let meal = MealType::from_api_value(&key);
        grouped.entry(meal).or_default().extend(items.into_iter().map(|item| {
            let mut suggestion = to_suggestion(item);
            suggestion.recipe.meal_type = meal;
            suggestion
        }));
    }
    grouped.values_mut().for_each(|bucket| sort_bucket(bucket));
    grouped
}

/// A flat list is bucketed by each recipe's decoded meal type.
pub fn group_list(items: Vec<DailySuggestion>) -> SuggestionBuckets {
    let mut grouped = SuggestionBuckets::new();
    for item in items {
        let suggestion = to_suggestion(item);
        grouped
            .entry(suggestion.recipe.meal_type)
            .or_default()
            .push(suggestion);
    }
    grouped.values_mut().for_each(|bucket| sort_bucket(bucket));
    grouped
}

pub fn group_payload(payload: DailySuggestionsPayload) -> SuggestionBuckets {
    match payload {
        DailySuggestionsPayload::Buckets(buckets) => group_buckets(buckets),
        DailySuggestionsPayload::List(items) => group_list(items),
    }
}

pub struct HomeSuggestions {
    api: ApiClient,
    tokens: Arc<dyn AccessTokenProvider>,
    state: watch::Sender<HomeState>,
}

impl HomeSuggestions {
    pub fn new(api: ApiClient, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        let (state, _) = watch::channel(HomeState::default());
        Self { api, tokens, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<HomeState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> HomeState {
        self.state.borrow().clone()
    }

    /// Fetch today's suggestions once. Later calls are no-ops, including
    /// after a failed attempt; use [`refresh_suggestions`] to retry.
    ///
    /// [`refresh_suggestions`]: Self::refresh_suggestions
    pub async fn load_daily_suggestions_if_needed(&self) -> Result<()> {
        let mut generation = None;
        self.state.send_if_modified(|s| {
            if s.is_loading || s.has_loaded {
                return false;
            }
            s.is_loading = true;
            generation = Some(s.generation);
            true
        });
        let Some(generation) = generation else {
            return Ok(());
        };

        let result = self.fetch_daily().await;
        self.apply(generation, result, |s| {
            s.is_loading = false;
            s.has_loaded = true;
        })
    }

    /// Ask the backend for a fresh set. `count_per_meal` is clamped to 1..=5.
    pub async fn refresh_suggestions(&self, count_per_meal: u32) -> Result<()> {
        let mut generation = None;
        self.state.send_if_modified(|s| {
            if s.is_refreshing {
                return false;
            }
            s.is_refreshing = true;
            generation = Some(s.generation);
            true
        });
        let Some(generation) = generation else {
            return Ok(());
        };

        let count = count_per_meal.clamp(MIN_COUNT_PER_MEAL, MAX_COUNT_PER_MEAL);
        let result = self.fetch_refresh(count).await;
        self.apply(generation, result, |s| s.is_refreshing = false)
    }

    pub fn reset(&self) {
        self.state.send_modify(|s| {
            let generation = s.generation + 1;
            *s = HomeState::default();
            s.generation = generation;
        });
        debug!("Home suggestions reset");
    }

    fn apply(
        &self,
        generation: u64,
        result: Result<SuggestionBuckets>,
        settle: impl FnOnce(&mut HomeState),
    ) -> Result<()> {
        self.state.send_modify(|s| {
            if s.generation != generation {
                return;
            }
            settle(s);
            match &result {
                Ok(buckets) => {
                    s.suggestions_by_meal = buckets.clone();
                    s.error_message = None;
                }
                Err(e) => s.error_message = Some(e.to_string()),
            }
        });
        result.map(|buckets| {
            let total: usize = buckets.values().map(Vec::len).sum();
            info!(meals = buckets.len(), total, "Loaded daily suggestions");
        })
    }

    async fn fetch_daily(&self) -> Result<SuggestionBuckets> {
        let token = self.tokens.access_token().await?;
        let response: DailySuggestionsResponse = self
            .api
            .get("/daily/suggestions", &[], Some(&token))
            .await?;
        if let Some(run) = &response.run {
            debug!(run_id = %run.id, status = ?run.status, "Daily run");
        }
        Ok(group_payload(response.suggestions))
    }

    async fn fetch_refresh(&self, count: u32) -> Result<SuggestionBuckets> {
        let token = self.tokens.access_token().await?;
        let query = [("count_per_meal", count.to_string())];
        let response: DailyRefreshResponse = self
            .api
            .get("/daily/refresh", &query, Some(&token))
            .await?;
        Ok(group_buckets(response.suggestions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suggestion(id: &str, rank: Option<i64>, tags: &[&str]) -> DailySuggestion {
        serde_json::from_value(json!({
            "id": id,
            "rank": rank,
            "recipe_data": {"id": format!("r-{}", id), "title": id, "tags": tags}
        }))
        .unwrap()
    }

    #[test]
    fn test_buckets_sorted_by_rank_then_id() {
        let buckets = BTreeMap::from([(
            "dinner".to_string(),
            vec![
                suggestion("c", None, &[]),
                suggestion("b", Some(2), &[]),
                suggestion("a", Some(2), &[]),
                suggestion("d", Some(1), &[]),
            ],
        )]);
        let grouped = group_buckets(buckets);
        let ids: Vec<&str> = grouped[&MealType::Dinner].iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_unknown_bucket_keys_fall_into_other() {
        let buckets = BTreeMap::from([
            ("snack".to_string(), vec![suggestion("x", None, &[])]),
            ("Breakfast".to_string(), vec![suggestion("y", Some(1), &[])]),
        ]);
        let grouped = group_buckets(buckets);
        assert_eq!(grouped[&MealType::Other].len(), 1);
        assert_eq!(grouped[&MealType::Breakfast][0].id, "y");
    }

    #[test]
    fn test_bucket_sets_recipe_meal_type() {
        let buckets = BTreeMap::from([(
            "dinner".to_string(),
            vec![suggestion("plain", None, &[]), suggestion("tagged", None, &["lunch"])],
        )]);
        let grouped = group_buckets(buckets);
        let meals: Vec<MealType> = grouped[&MealType::Dinner]
            .iter()
            .map(|s| s.recipe.meal_type)
            .collect();
        assert_eq!(meals, vec![MealType::Dinner, MealType::Dinner]);
    }

    #[test]
    fn test_list_grouped_by_recipe_meal_type() {
        let grouped = group_list(vec![
            suggestion("a", Some(1), &["lunch"]),
            suggestion("b", None, &["quick"]),
        ]);
        assert_eq!(grouped[&MealType::Lunch][0].id, "a");
        assert_eq!(grouped[&MealType::Other][0].id, "b");
        assert!(HomeState::default().suggestions(MealType::Lunch).is_empty());
    }
}
