const DEFAULT_SECRET: &str = "healthagg-secret-key-change-in-production";

/// Process configuration, read once at startup from the environment
/// (`.env` honored via dotenvy in `main`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Signing value for auth tokens.
    pub secret_key: String,
    /// Optional server-side AI credential used when the caller supplies none.
    pub gemini_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let secret_key = std::env::var("SECRET_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("SECRET_KEY not set; using insecure default");
                DEFAULT_SECRET.to_string()
            });

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if gemini_api_key.is_none() {
            tracing::info!("GEMINI_API_KEY not set; analysis will rely on caller keys or fallback");
        }

        Self {
            secret_key,
            gemini_api_key,
        }
    }
}
