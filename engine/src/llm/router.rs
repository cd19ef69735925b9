//! LLM Router
//!
//! Turns a conversation into a single response text. Each request names a
//! routing tier; the router tries the tier's preferred cloud provider first,
//! then the remaining cloud providers in the order they were declared, and
//! finally the local provider. The local provider never cascades: its failure
//! is the failure of the whole call.

use super::anthropic::AnthropicProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAICompatProvider;
use super::{LLMError, LLMProvider, Message, TokenUsage};
use crate::config::LLMConfig;
use crate::events::{EventKind, EventMetrics, EventSink};
use crate::secrets::{scrub, ApiKeys};
use sdk::is_tool_output;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-attempt timeout for cloud providers
pub const CLOUD_TIMEOUT: Duration = Duration::from_secs(60);

/// Default per-attempt timeout for the local provider (covers model loading)
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Time allowed for a single health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Routing preference for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingTier {
    /// Reasoning over fresh human input
    Smart,
    /// Cheap continuation after a tool result
    Fast,
}

impl RoutingTier {
    /// Tool results go to the fast tier, everything else to the smart tier
    pub fn for_input(input: &str) -> Self {
        if is_tool_output(input) {
            RoutingTier::Fast
        } else {
            RoutingTier::Smart
        }
    }
}

impl std::fmt::Display for RoutingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingTier::Smart => write!(f, "SMART"),
            RoutingTier::Fast => write!(f, "FAST"),
        }
    }
}

/// Preferred cloud provider per tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPreferences {
    pub smart: String,
    pub fast: String,
}

impl TierPreferences {
    fn preferred(&self, tier: RoutingTier) -> &str {
        match tier {
            RoutingTier::Smart => &self.smart,
            RoutingTier::Fast => &self.fast,
        }
    }
}

impl Default for TierPreferences {
    fn default() -> Self {
        Self {
            smart: "anthropic".to_string(),
            fast: "deepseek".to_string(),
        }
    }
}

/// Successful routed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedReply {
    /// Raw response text, unaltered
    pub content: String,
    pub model: String,
    /// Provider that answered
    pub provider: String,
    pub usage: TokenUsage,
    pub duration_ms: u64,
}

/// LLM Router with tiered selection and cascading fallback
pub struct LLMRouter {
    /// Cloud providers in declared order
    cloud: Vec<Box<dyn LLMProvider>>,

    /// Always-configured local provider
    local: Box<dyn LLMProvider>,

    preferences: TierPreferences,
    events: Arc<dyn EventSink>,
    cloud_timeout: Duration,
    local_timeout: Duration,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `cloud` - Configured cloud providers, in declared order
    /// * `local` - The local provider that ends every chain
    /// * `preferences` - Which cloud provider each tier tries first
    /// * `events` - Receiver of API_REQ / API_CALL / ERROR events
    pub fn new(
        cloud: Vec<Box<dyn LLMProvider>>,
        local: Box<dyn LLMProvider>,
        preferences: TierPreferences,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            cloud,
            local,
            preferences,
            events,
            cloud_timeout: CLOUD_TIMEOUT,
            local_timeout: LOCAL_TIMEOUT,
        }
    }

    /// Build the router from configuration and the available credentials
    ///
    /// Cloud providers without a usable key are left out; Ollama is always
    /// present.
    pub fn from_config(config: &LLMConfig, keys: &ApiKeys, events: Arc<dyn EventSink>) -> Self {
        let mut cloud: Vec<Box<dyn LLMProvider>> = Vec::new();

        if let Some(key) = &keys.anthropic {
            tracing::info!("Anthropic connected ({})", config.anthropic.model);
            cloud.push(Box::new(AnthropicProvider::new(
                config.anthropic.clone(),
                key.clone(),
            )));
        }
        if let Some(key) = &keys.deepseek {
            tracing::info!("DeepSeek connected ({})", config.deepseek.model);
            cloud.push(Box::new(OpenAICompatProvider::deepseek(
                config.deepseek.clone(),
                key.clone(),
            )));
        }
        if let Some(key) = &keys.openai {
            tracing::info!("OpenAI connected ({})", config.openai.model);
            cloud.push(Box::new(OpenAICompatProvider::openai(
                config.openai.clone(),
                key.clone(),
            )));
        }

        if cloud.is_empty() {
            tracing::info!("No cloud providers configured, using local Ollama only");
        }

        let local = Box::new(OllamaProvider::new(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
        ));

        Self::new(cloud, local, TierPreferences::default(), events)
    }

    /// Override the per-attempt timeouts
    pub fn with_timeouts(mut self, cloud: Duration, local: Duration) -> Self {
        self.cloud_timeout = cloud;
        self.local_timeout = local;
        self
    }

    /// Provider names in the order a request of `tier` would try them
    pub fn plan(&self, tier: RoutingTier) -> Vec<&str> {
        self.chain(tier).into_iter().map(|p| p.name()).collect()
    }

    fn chain(&self, tier: RoutingTier) -> Vec<&dyn LLMProvider> {
        let preferred = self.preferences.preferred(tier);
        let mut chain: Vec<&dyn LLMProvider> = Vec::with_capacity(self.cloud.len() + 1);

        if let Some(p) = self.cloud.iter().find(|p| p.name() == preferred) {
            chain.push(p.as_ref());
        }
        chain.extend(
            self.cloud
                .iter()
                .filter(|p| p.name() != preferred)
                .map(|p| p.as_ref()),
        );
        chain.push(self.local.as_ref());
        chain
    }

    /// Send the conversation through the fallback chain for `tier`
    ///
    /// Returns the first successful response. Fails only when the local
    /// provider fails.
    pub async fn chat(
        &self,
        messages: &[Message],
        tier: RoutingTier,
    ) -> super::Result<RoutedReply> {
        let request_log = serde_json::to_string(messages)
            .map_err(|e| LLMError::InvalidRequest(e.to_string()))?;

        for provider in self.chain(tier) {
            let timeout = if provider.is_local() {
                self.local_timeout
            } else {
                self.cloud_timeout
            };

            tracing::debug!(
                "Attempting provider: {} (tier: {}, timeout: {}s)",
                provider.name(),
                tier,
                timeout.as_secs()
            );

            self.events
                .log(
                    EventKind::ApiReq,
                    &request_log,
                    Some(EventMetrics::for_model(provider.model())),
                )
                .await;

            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, provider.generate(messages)).await {
                Ok(result) => result,
                Err(_) => Err(LLMError::Timeout),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(reply) => {
                    tracing::info!(
                        "Provider {} answered in {}ms ({} → {} tokens)",
                        provider.name(),
                        duration_ms,
                        reply.usage.input_tokens,
                        reply.usage.output_tokens
                    );

                    let metrics = EventMetrics {
                        model: Some(reply.model.clone()),
                        tokens_in: reply.usage.input_tokens,
                        tokens_out: reply.usage.output_tokens,
                        cost: None,
                        duration_ms,
                    };
                    self.events
                        .log(EventKind::ApiCall, &reply.content, Some(metrics))
                        .await;

                    return Ok(RoutedReply {
                        content: reply.content,
                        model: reply.model,
                        provider: provider.name().to_string(),
                        usage: reply.usage,
                        duration_ms,
                    });
                }
                Err(e) => {
                    let detail = scrub(&e.to_string());
                    let message = format!(
                        "{} ({}) failed [{}]: {}",
                        provider.name(),
                        provider.model(),
                        e.kind(),
                        detail
                    );
                    self.events
                        .log(
                            EventKind::Error,
                            &message,
                            Some(EventMetrics {
                                duration_ms,
                                ..EventMetrics::for_model(provider.model())
                            }),
                        )
                        .await;

                    if provider.is_local() {
                        tracing::error!("Local provider {} failed: {}", provider.name(), detail);
                        return Err(LLMError::ProviderUnavailable(format!(
                            "All LLM providers failed; local {} error: {}",
                            provider.name(),
                            detail
                        )));
                    }

                    tracing::warn!(
                        "Provider {} failed ({}), falling back: {}",
                        provider.name(),
                        e.kind(),
                        detail
                    );
                }
            }
        }

        // The chain always ends with the local provider, which returns above.
        Err(LLMError::ProviderUnavailable(
            "All LLM providers failed".to_string(),
        ))
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, model, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, &str, bool)> {
        let mut results = Vec::new();
        for provider in self.cloud.iter().chain(std::iter::once(&self.local)) {
            let is_healthy = tokio::time::timeout(HEALTH_TIMEOUT, provider.check_health())
                .await
                .unwrap_or(false);
            results.push((provider.name(), provider.model(), is_healthy));
        }
        results
    }

    /// Names of the configured cloud providers
    pub fn cloud_providers(&self) -> Vec<&str> {
        self.cloud.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MemorySink, NullSink};
    use crate::llm::{ProviderReply, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Mock provider for testing
    struct MockProvider {
        name: String,
        is_local: bool,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl MockProvider {
        fn boxed(name: &str, is_local: bool, fail: bool) -> Box<dyn LLMProvider> {
            Box::new(Self {
                name: name.to_string(),
                is_local,
                fail,
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        fn is_local(&self) -> bool {
            self.is_local
        }

        async fn generate(&self, _messages: &[Message]) -> Result<ProviderReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LLMError::NetworkError(format!("{} down", self.name)))
            } else {
                Ok(ProviderReply::new(
                    format!("{{\"reply\":\"from {}\"}}", self.name),
                    "mock-model",
                    TokenUsage {
                        input_tokens: 10,
                        output_tokens: 5,
                    },
                ))
            }
        }
    }

    fn all_cloud(fail: bool) -> Vec<Box<dyn LLMProvider>> {
        vec![
            MockProvider::boxed("anthropic", false, fail),
            MockProvider::boxed("deepseek", false, fail),
            MockProvider::boxed("openai", false, fail),
        ]
    }

    #[test]
    fn test_tier_classification() {
        assert_eq!(RoutingTier::for_input("Tool Output: ok"), RoutingTier::Fast);
        assert_eq!(RoutingTier::for_input("Build a CSV parser"), RoutingTier::Smart);
        assert_eq!(RoutingTier::for_input(" Tool Output: ok"), RoutingTier::Smart);
    }

    #[test]
    fn test_plan_prefers_tier_provider() {
        let router = LLMRouter::new(
            all_cloud(false),
            MockProvider::boxed("ollama", true, false),
            TierPreferences::default(),
            Arc::new(NullSink),
        );

        assert_eq!(
            router.plan(RoutingTier::Smart),
            vec!["anthropic", "deepseek", "openai", "ollama"]
        );
        assert_eq!(
            router.plan(RoutingTier::Fast),
            vec!["deepseek", "anthropic", "openai", "ollama"]
        );
    }

    #[test]
    fn test_plan_without_cloud_is_local_only() {
        let router = LLMRouter::new(
            vec![],
            MockProvider::boxed("ollama", true, false),
            TierPreferences::default(),
            Arc::new(NullSink),
        );

        assert_eq!(router.plan(RoutingTier::Smart), vec!["ollama"]);
        assert_eq!(router.plan(RoutingTier::Fast), vec!["ollama"]);
    }

    #[tokio::test]
    async fn test_preferred_provider_answers() {
        let sink = Arc::new(MemorySink::new());
        let router = LLMRouter::new(
            all_cloud(false),
            MockProvider::boxed("ollama", true, false),
            TierPreferences::default(),
            sink.clone(),
        );

        let reply = router
            .chat(&[Message::user("Tool Output: ok")], RoutingTier::Fast)
            .await
            .unwrap();

        assert_eq!(reply.provider, "deepseek");
        assert_eq!(reply.content, "{\"reply\":\"from deepseek\"}");
        assert_eq!(sink.kinds(), vec![EventKind::ApiReq, EventKind::ApiCall]);
    }

    #[tokio::test]
    async fn test_cascade_reaches_local() {
        let sink = Arc::new(MemorySink::new());
        let router = LLMRouter::new(
            all_cloud(true),
            MockProvider::boxed("ollama", true, false),
            TierPreferences::default(),
            sink.clone(),
        );

        let reply = router
            .chat(&[Message::user("hi")], RoutingTier::Smart)
            .await
            .unwrap();

        assert_eq!(reply.provider, "ollama");
        let errors = sink
            .kinds()
            .into_iter()
            .filter(|k| *k == EventKind::Error)
            .count();
        assert_eq!(errors, 3);
    }

    #[tokio::test]
    async fn test_local_failure_is_terminal() {
        let router = LLMRouter::new(
            vec![],
            MockProvider::boxed("ollama", true, true),
            TierPreferences::default(),
            Arc::new(NullSink),
        );

        let err = router
            .chat(&[Message::user("hi")], RoutingTier::Smart)
            .await
            .unwrap_err();

        assert!(matches!(err, LLMError::ProviderUnavailable(_)));
        assert!(err.to_string().contains("All LLM providers failed"));
    }

    #[tokio::test]
    async fn test_check_health_lists_local_last() {
        let router = LLMRouter::new(
            vec![MockProvider::boxed("deepseek", false, false)],
            MockProvider::boxed("ollama", true, false),
            TierPreferences::default(),
            Arc::new(NullSink),
        );

        let health = router.check_health().await;
        assert_eq!(health.len(), 2);
        assert_eq!(health[1].0, "ollama");
        assert!(health.iter().all(|(_, _, ok)| *ok));
    }
}
