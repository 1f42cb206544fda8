//! # Builder for DeliveryConfig
//!
//! This module provides a builder pattern implementation for creating and
//! customizing DeliveryConfig instances with a fluent API.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use cidio_engine::DeliveryConfig;
//!
//! let config = DeliveryConfig::builder()
//!     .with_cache_name("my-assets")
//!     .with_external_host("assets.example.com")
//!     .with_config_endpoint("https://example.com/api/config")
//!     .with_probe_timeout(Duration::from_secs(3))
//!     .with_max_cache_size(200 * 1024 * 1024)
//!     .build();
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderValue;

use crate::{DeliveryConfig, proxy::ProxyConfig};

/// Builder for creating DeliveryConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct DeliveryConfigBuilder {
    /// Internal config being built
    config: DeliveryConfig,
}

impl DeliveryConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DeliveryConfig::default(),
        }
    }

    /// Set the name of the persistent asset cache
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache_name = name.into();
        self
    }

    /// Set the directory backing the persistent cache tier
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    /// Set the audited ceiling for the persistent cache in bytes
    pub fn with_max_cache_size(mut self, bytes: u64) -> Self {
        self.config.max_cache_size = bytes;
        self
    }

    /// Set the budget for the in-memory cache tier in bytes
    pub fn with_max_memory_cache_size(mut self, bytes: u64) -> Self {
        self.config.max_memory_cache_size = bytes;
        self
    }

    /// Add a hostname to the external asset host allow-list
    pub fn with_external_host(mut self, host: impl Into<String>) -> Self {
        self.config.external_hosts.push(host.into());
        self
    }

    /// Replace the external asset host allow-list
    pub fn with_external_hosts(mut self, hosts: Vec<String>) -> Self {
        self.config.external_hosts = hosts;
        self
    }

    /// Replace the cacheable extension allow-list
    pub fn with_cacheable_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.cacheable_extensions = extensions;
        self
    }

    /// Set the endpoint advertising system gateways
    pub fn with_config_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.config_endpoint = endpoint.into();
        self
    }

    /// Set the per-candidate probe timeout for gateway failover
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Set an explicit proxy configuration
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Set whether to use system proxy settings if available
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.config.use_system_proxy = use_system_proxy;
        self
    }

    /// Build the final DeliveryConfig
    pub fn build(self) -> DeliveryConfig {
        self.config
    }
}

impl Default for DeliveryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = DeliveryConfigBuilder::new()
            .with_cache_name("test-cache")
            .with_external_host("assets.example.com")
            .with_probe_timeout(Duration::from_millis(250))
            .with_follow_redirects(false)
            .build();

        assert_eq!(config.cache_name, "test-cache");
        assert_eq!(config.external_hosts, vec!["assets.example.com"]);
        assert_eq!(config.probe_timeout, Duration::from_millis(250));
        assert!(!config.follow_redirects);
    }

    #[test]
    fn default_extension_list_is_media_only() {
        let config = DeliveryConfig::default();
        assert!(config.cacheable_extensions.contains(&".mp3".to_string()));
        assert!(config.cacheable_extensions.contains(&".mp4".to_string()));
        assert!(!config.cacheable_extensions.contains(&".jpg".to_string()));
        assert!(!config.cacheable_extensions.contains(&".html".to_string()));
    }
}
