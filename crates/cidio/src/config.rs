use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::proxy::ProxyConfig;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Engine version reported through `get_worker_status`.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extensions eligible for interception and caching: audio/video container
/// formats only, an explicit allow-list.
pub const CACHEABLE_EXTENSIONS: [&str; 6] = [".mp3", ".flac", ".mp4", ".wav", ".m4a", ".ogg"];

/// Configurable options for the delivery engine
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Name of the persistent asset cache
    pub cache_name: String,

    /// Directory backing the persistent cache tier (`None` = system temp)
    pub cache_dir: Option<PathBuf>,

    /// Ceiling for the persistent cache in bytes, checked by the periodic
    /// size audit rather than enforced on every write
    pub max_cache_size: u64,

    /// Budget for the in-memory cache tier in bytes
    pub max_memory_cache_size: u64,

    /// Hostnames whose asset requests are intercepted by the cache worker
    pub external_hosts: Vec<String>,

    /// Path suffixes eligible for caching on intercepted hosts
    pub cacheable_extensions: Vec<String>,

    /// Endpoint advertising system gateways; an empty string means "no
    /// configuration endpoint" and resolution uses the built-in fallback list
    pub config_endpoint: String,

    /// Per-candidate probe timeout during gateway failover
    pub probe_timeout: Duration,

    /// Overall timeout for the entire HTTP request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            cache_name: "cidio-assets-v1".to_string(),
            cache_dir: None,
            max_cache_size: 500 * 1024 * 1024,       // 500MB
            max_memory_cache_size: 30 * 1024 * 1024, // 30MB
            external_hosts: Vec::new(),
            cacheable_extensions: CACHEABLE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            config_endpoint: String::new(),
            probe_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DeliveryConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
        }
    }
}

impl DeliveryConfig {
    pub fn builder() -> crate::builder::DeliveryConfigBuilder {
        crate::builder::DeliveryConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }
}
