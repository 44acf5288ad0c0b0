use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;

use crate::infrastructure::auth::JwtConfig;
use crate::infrastructure::cache::{redact_url, CacheConfig};
use crate::infrastructure::upstream::{GatewayConfig, DEFAULT_USER_AGENT};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
    pub upstream: UpstreamSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Redis URL; unset means the local cache is used
    pub backing_address: Option<String>,
    pub default_ttl_secs: u64,
    pub connect_timeout_ms: u64,
    pub key_prefix: String,
    pub max_capacity: u64,
    /// TTL overrides in seconds, keyed by resource name
    pub resource_ttls: HashMap<String, u64>,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub base_url: String,
    /// Fallback credential when a request carries none
    pub api_key: Option<String>,
    pub call_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub expiration_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();

        Self {
            backing_address: None,
            default_ttl_secs: defaults.default_ttl.as_secs(),
            connect_timeout_ms: defaults.connect_timeout.as_millis() as u64,
            key_prefix: defaults.key_prefix,
            max_capacity: defaults.max_capacity,
            resource_ttls: HashMap::new(),
        }
    }
}

impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("backing_address", &self.backing_address.as_deref().map(redact_url))
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("key_prefix", &self.key_prefix)
            .field("max_capacity", &self.max_capacity)
            .field("resource_ttls", &self.resource_ttls)
            .finish()
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.organizze.com.br/rest/v2".to_string(),
            api_key: None,
            call_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[hidden]"))
            .field("call_timeout_secs", &self.call_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        let defaults = JwtConfig::default();

        Self {
            jwt_secret: defaults.secret,
            expiration_hours: defaults.expiration_hours,
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"[hidden]")
            .field("expiration_hours", &self.expiration_hours)
            .finish()
    }
}

impl AppConfig {
    /// Loads `config/default`, `config/local` and `APP__*` environment variables, in that order
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            backing_address: self
                .cache
                .backing_address
                .clone()
                .filter(|address| !address.trim().is_empty()),
            default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
            connect_timeout: Duration::from_millis(self.cache.connect_timeout_ms),
            key_prefix: self.cache.key_prefix.clone(),
            max_capacity: self.cache.max_capacity,
        }
    }

    /// Gateway settings; configured TTL overrides extend the built-in ones
    pub fn gateway_config(&self) -> GatewayConfig {
        let mut gateway = GatewayConfig::default()
            .with_call_timeout(Duration::from_secs(self.upstream.call_timeout_secs));

        gateway.api_key = self
            .upstream
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty());

        for (resource, secs) in &self.cache.resource_ttls {
            gateway = gateway.with_resource_ttl(resource.as_str(), Duration::from_secs(*secs));
        }

        gateway
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(self.auth.jwt_secret.clone(), self.auth.expiration_hours)
    }
}
