use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::AiConfig;
use crate::error::{KursError, Result};
use crate::limiter::RateLimiter;
use crate::provider::ModelTier;

/// Cooperative cancellation flag, checked between streamed chunks. An
/// attempt that has already started is allowed to run to completion.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a single JSON object instead of prose.
    pub json_output: bool,
}

/// Seam between the client and the wire. The production implementation
/// talks to the hosted model; tests script responses and failures.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<String>>>;
}

/// Chat-completions backend for the hosted Gemini endpoint.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    fn request_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [
                { "role": "user", "content": request.prompt },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_output {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }
        body
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(request, stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(512);
            return Err(KursError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let value: serde_json::Value = self.send(request, false).await?.json().await?;

        let choice = &value["choices"][0];
        if choice["finish_reason"].as_str() == Some("content_filter") {
            return Err(KursError::ContentBlocked {
                reason: "provider safety filter".to_string(),
            });
        }

        choice["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| KursError::InvalidResponse {
                reason: "response carries no message content".to_string(),
            })
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self.send(request, true).await?;
        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield Err(KursError::Http(err));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }

                    let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else {
                        continue;
                    };
                    let choice = &event["choices"][0];
                    if choice["finish_reason"].as_str() == Some("content_filter") {
                        yield Err(KursError::ContentBlocked {
                            reason: "provider safety filter".to_string(),
                        });
                        return;
                    }
                    if let Some(delta) = choice["delta"]["content"].as_str() {
                        if !delta.is_empty() {
                            yield Ok(delta.to_string());
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Strip markdown fences and surrounding prose, leaving the outermost JSON
/// object. The model occasionally wraps its JSON despite instructions.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

pub fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(extract_json(raw))?)
}

/// Model access with tier selection, budget enforcement, and the shared
/// retry policy. Every call goes through the injected [`RateLimiter`].
pub struct ModelClient {
    backend: Arc<dyn GenerationBackend>,
    config: AiConfig,
    limiter: Arc<RateLimiter>,
}

impl ModelClient {
    pub fn new(config: AiConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let api_key = config.provider.validate_api_key()?;
        let api_url = config.provider.config().api_url.to_string();
        let backend = Arc::new(GeminiBackend::new(api_url, api_key));
        Ok(Self::with_backend(backend, config, limiter))
    }

    pub fn with_backend(
        backend: Arc<dyn GenerationBackend>,
        config: AiConfig,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            backend,
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    fn request(&self, tier: ModelTier, prompt: &str, temperature: Option<f32>, json: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.config.model_for(tier).to_string(),
            prompt: prompt.to_string(),
            temperature: temperature.unwrap_or(self.config.temperature),
            max_tokens: self.config.max_output_tokens,
            json_output: json,
        }
    }

    /// Generate free text.
    pub async fn generate_text(
        &self,
        tier: ModelTier,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<String> {
        let request = self.request(tier, prompt, temperature, false);
        let operation_id = format!("text-{}-{}", tier.name(), Uuid::new_v4());
        self.limiter
            .with_retry(
                &operation_id,
                RateLimiter::estimate_tokens(prompt),
                async || self.backend.complete(&request).await,
            )
            .await
    }

    /// Generate a structured object, parsed from the model's JSON output.
    /// Parse failures are validation errors and are never retried.
    pub async fn generate_object<T: DeserializeOwned>(
        &self,
        tier: ModelTier,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<T> {
        let request = self.request(tier, prompt, temperature, true);
        let operation_id = format!("object-{}-{}", tier.name(), Uuid::new_v4());
        let raw = self
            .limiter
            .with_retry(
                &operation_id,
                RateLimiter::estimate_tokens(prompt),
                async || self.backend.complete(&request).await,
            )
            .await?;
        parse_json_object(&raw)
    }

    /// Stream a structured object incrementally. `on_delta` observes each
    /// raw chunk; the abort handle is honored between chunks. Connection
    /// establishment is retried; an in-flight stream is not.
    pub async fn stream_object<T, F>(
        &self,
        tier: ModelTier,
        prompt: &str,
        temperature: Option<f32>,
        abort: &AbortHandle,
        mut on_delta: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut(&str),
    {
        let request = self.request(tier, prompt, temperature, true);
        let operation_id = format!("stream-{}-{}", tier.name(), Uuid::new_v4());
        let mut stream = self
            .limiter
            .with_retry(
                &operation_id,
                RateLimiter::estimate_tokens(prompt),
                async || self.backend.complete_stream(&request).await,
            )
            .await?;

        let mut accumulated = String::new();
        while let Some(delta) = stream.next().await {
            if abort.is_aborted() {
                tracing::info!(target: "client", %operation_id, "stream aborted by caller");
                return Err(KursError::Cancelled);
            }
            let delta = delta?;
            on_delta(&delta);
            accumulated.push_str(&delta);
        }

        parse_json_object(&accumulated)
    }
}
