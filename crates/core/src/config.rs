use std::env;

use crate::provider::{ModelTier, Provider};

/// Budgets enforced by the rate limiter, plus the shared retry policy knobs.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u32,
    /// Hard ceiling for a single request's estimated token count. Requests
    /// over this fail immediately and are never retried.
    pub max_tokens_per_request: u32,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 20,
            tokens_per_minute: 100_000,
            max_tokens_per_request: 16_000,
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 32_000,
        }
    }
}

/// Process-wide AI settings, read from the environment once at startup.
#[derive(Clone, Debug)]
pub struct AiConfig {
    pub provider: Provider,
    pub model_fast: String,
    pub model_default: String,
    pub model_smart: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub streaming_enabled: bool,
    pub rate_limits: RateLimitConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            model_fast: "gemini-2.5-flash-lite".to_string(),
            model_default: "gemini-2.5-flash".to_string(),
            model_smart: "gemini-2.5-pro".to_string(),
            temperature: 0.7,
            max_output_tokens: 8_192,
            streaming_enabled: true,
            rate_limits: RateLimitConfig::default(),
        }
    }
}

impl AiConfig {
    /// Read configuration from the environment. A missing API key is logged
    /// as a warning rather than failing startup, so offline commands (cache
    /// inspection, notes) keep working.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if config.provider.validate_api_key().is_err() {
            tracing::warn!(
                target: "config",
                env_var = config.provider.config().env_var,
                "API key is not configured - model calls will fail"
            );
        }

        if let Ok(v) = env::var("KURS_MODEL_FAST") {
            config.model_fast = v;
        }
        if let Ok(v) = env::var("KURS_MODEL_DEFAULT") {
            config.model_default = v;
        }
        if let Ok(v) = env::var("KURS_MODEL_SMART") {
            config.model_smart = v;
        }
        if let Some(v) = parse_env("KURS_TEMPERATURE") {
            config.temperature = v;
        }
        if let Some(v) = parse_env("KURS_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = v;
        }
        if let Ok(v) = env::var("KURS_STREAMING") {
            config.streaming_enabled = !matches!(v.as_str(), "0" | "false" | "off");
        }
        if let Some(v) = parse_env("KURS_REQUESTS_PER_MINUTE") {
            config.rate_limits.requests_per_minute = v;
        }
        if let Some(v) = parse_env("KURS_TOKENS_PER_MINUTE") {
            config.rate_limits.tokens_per_minute = v;
        }
        if let Some(v) = parse_env("KURS_MAX_TOKENS_PER_REQUEST") {
            config.rate_limits.max_tokens_per_request = v;
        }

        config
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.model_fast,
            ModelTier::Default => &self.model_default,
            ModelTier::Smart => &self.model_smart,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
