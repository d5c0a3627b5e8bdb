use crate::error::{KursError, Result};

/// Model tier selection. Tiers trade latency for quality; the concrete model
/// id behind each tier comes from [`crate::config::AiConfig`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    #[default]
    Default,
    Smart,
}

impl ModelTier {
    pub fn name(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Default => "default",
            ModelTier::Smart => "smart",
        }
    }
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub env_var: &'static str,
}

/// The hosted model provider, reached through its OpenAI-compatible chat
/// completions surface.
#[derive(Clone, Debug, Default)]
pub enum Provider {
    #[default]
    Gemini,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                env_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
        }
    }

    /// Validate that the API key is set for this provider
    pub fn validate_api_key(&self) -> Result<String> {
        let config = self.config();
        std::env::var(config.env_var).map_err(|_| KursError::MissingApiKey {
            env_var: config.env_var.to_string(),
        })
    }
}
