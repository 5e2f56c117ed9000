/// Application name
pub const APP_NAME: &str = "whatEat";

/// Default backend root, already including the `/api/v1` prefix
pub const DEFAULT_API_BASE_URL: &str = "https://whateatbe.onrender.com/api/v1";

/// Namespace under which auth secrets are stored
pub const DEFAULT_SECRET_SERVICE: &str = "com.whatEat.auth";

/// Access tokens expiring sooner than this are refreshed before use (seconds)
pub const TOKEN_REFRESH_WINDOW_SECS: i64 = 300;

/// Default page size for the saved-recipes list
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Client-side cap for cover images (10 MiB). The server may tighten it.
pub const MAX_COVER_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Bounds and default for `count_per_meal` on the daily refresh endpoint
pub const MIN_COUNT_PER_MEAL: u32 = 1;
pub const MAX_COUNT_PER_MEAL: u32 = 5;
pub const DEFAULT_COUNT_PER_MEAL: u32 = 2;

/// Cover upload defaults
pub const DEFAULT_COVER_CONTENT_TYPE: &str = "image/jpeg";
pub const DEFAULT_COVER_FILE_NAME: &str = "cover.jpg";
pub const COVER_PHOTO_MEDIA_NAME: &str = "Cover photo";
pub const COVER_PHOTO_MEDIA_TYPE: &str = "image";

/// Display fallbacks used by the codec
pub const PREP_TIME_UNKNOWN: &str = "N/A";
pub const INGREDIENT_PLACEHOLDER: &str = "Ingredient";
pub const STEP_DESCRIPTION_PLACEHOLDER: &str = "Instructions coming soon.";

/// `sourceType` given to recipes materialized by a save
pub const SOURCE_TYPE_USER: &str = "user";

/// Identity provider name sent on sign-in
pub const AUTH_PROVIDER_APPLE: &str = "apple";
