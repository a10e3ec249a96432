use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AtelierConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub routing: RoutingConfig,
    pub sessions: SessionConfig,
}

impl AtelierConfig {
    /// Read `atelier.toml`-style config. Missing sections keep their defaults
    /// and environment overrides are applied last.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: AtelierConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like `load`, but a missing file means defaults plus environment overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Environment wins over the file (`ATELIER_*`, `LLM_*`, `FRONTEND_URL`, `GOOGLE_CLOUD_*`).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ATELIER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("ATELIER_PORT") {
            if let Ok(n) = v.parse() {
                self.server.port = n;
            }
        }
        if let Ok(v) = std::env::var("FRONTEND_URL") {
            self.server.frontend_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.llm.timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("GOOGLE_CLOUD_PROJECT") {
            self.llm.project = Some(v);
        }
        if let Ok(v) = std::env::var("GOOGLE_CLOUD_LOCATION") {
            self.llm.location = Some(v);
        }
        if let Ok(v) = std::env::var("ATELIER_CLASSIFIER") {
            self.routing.classifier = v;
        }
        if let Ok(v) = std::env::var("ATELIER_RESPONDER") {
            self.routing.responder = v;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins permitted to call the API from a browser.
    pub allowed_origins: Vec<String>,
    /// Frontend base URL; appended to the allow-list when set.
    pub frontend_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            frontend_url: None,
        }
    }
}

impl ServerConfig {
    /// The effective CORS allow-list, deduplicated, in declaration order.
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = Vec::new();
        let extra = self.frontend_url.iter().map(|u| u.trim_end_matches('/').to_string());
        for origin in self.allowed_origins.iter().cloned().chain(extra) {
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
        origins
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" (any OpenAI-compatible endpoint) or "mock".
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound for one classification / generation call, retries included.
    pub timeout_secs: u64,
    /// Hosted backend identifiers, informational.
    pub project: Option<String>,
    pub location: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_secs: 20,
            project: None,
            location: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// "keyword" or "llm".
    pub classifier: String,
    /// "canned" or "llm".
    pub responder: String,
    /// Prefix of the `app` part of every conversation key.
    pub app_name: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            classifier: "keyword".to_string(),
            responder: "canned".to_string(),
            app_name: "FashionStylistApp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum live sessions; 0 means unbounded.
    pub capacity: usize,
    /// Idle sessions older than this are purged; 0 disables expiry.
    pub idle_ttl_secs: u64,
    /// Turns kept per session.
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            idle_ttl_secs: 86_400,
            max_history: 20,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
