use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address the scrape endpoint listens on
    pub listen_addr: String,
    /// Backend endpoints, one stats slot each, in configuration order
    pub endpoints: Vec<String>,
    /// Prefix of every exported metric name
    pub namespace: String,
    /// Window the latency quantiles cover
    pub summary_max_age_secs: u64,
    /// Number of rotating windows the max age is split into
    pub summary_age_buckets: usize,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9100".to_string(),
            endpoints: Vec::new(),
            namespace: "edgeproxy".to_string(),
            summary_max_age_secs: 600,
            summary_age_buckets: 5,
            debug: false,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    Ok(from_lookup(|key| std::env::var(key).ok()))
}

/// Build a config from any key lookup; missing or unparsable values fall
/// back to the defaults.
fn from_lookup<F>(lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let listen_addr = lookup("EDGESTATS_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let endpoints = lookup("EDGESTATS_ENDPOINTS")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let namespace = lookup("EDGESTATS_NAMESPACE")
        .filter(|v| !v.is_empty())
        .unwrap_or(defaults.namespace);

    let summary_max_age_secs = lookup("EDGESTATS_SUMMARY_MAX_AGE_SECS")
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(defaults.summary_max_age_secs);

    let summary_age_buckets = lookup("EDGESTATS_SUMMARY_AGE_BUCKETS")
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(defaults.summary_age_buckets);

    let debug = lookup("DEBUG").is_some();

    Config {
        listen_addr,
        endpoints,
        namespace,
        summary_max_age_secs,
        summary_age_buckets,
        debug,
    }
}
