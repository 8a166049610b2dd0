pub mod network {
    pub const TIMEOUT_API_REQUEST_MS: u64 = 60_000;
    pub const TIMEOUT_MODEL_REQUEST_MS: u64 = 60_000;
    pub const USER_AGENT: &str = "apicall/0.1.0";
    pub const ACCEPT: &str = "application/json";
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
    pub const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];
}

pub mod cache {
    pub const DEFAULT_TTL_MS: u64 = 120_000;
    pub const DEFAULT_MAX_ENTRIES: usize = 64;
}

pub mod auth {
    pub const RAPIDAPI_KEY_HEADER: &str = "X-RapidAPI-Key";
    pub const RAPIDAPI_HOST_HEADER: &str = "X-RapidAPI-Host";
}

pub mod insights {
    pub const TOP_ITEMS: usize = 5;
    pub const LIST_KEYS: &[&str] = &["results", "data", "list", "items"];
    pub const NAME_KEYS: &[&str] = &["title", "name", "id", "symbol"];
    pub const DATE_KEYS: &[&str] = &["release_date", "first_air_date", "date", "timestamp"];
    pub const METADATA_KEYS: &[&str] = &[
        "vote_count",
        "popularity",
        "release_date",
        "first_air_date",
        "market_cap",
        "current_price",
        "regularMarketPrice",
        "symbol",
        "id",
        "title",
        "name",
        "overview",
    ];
}

pub mod limits {
    pub const SUMMARY_PREVIEW_FIELDS: usize = 5;
    pub const SUMMARY_VALUE_CHARS: usize = 60;
    pub const SUMMARY_SAMPLE_NAMES: usize = 3;
    pub const ERROR_BODY_CHARS: usize = 2_000;
}

pub mod model {
    pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
    pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
}
