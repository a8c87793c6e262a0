use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data_service: DataServiceConfig,
    pub chart: ChartConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataServiceConfig {
    /// Base URL of the remote data service (e.g. "http://meters.local:8000").
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// Rendered point ceiling the aggregation level selector targets.
    #[serde(default = "default_target_points")]
    pub target_points: u64,
    /// Raw row count above which an unaggregated fetch needs explicit confirmation.
    #[serde(default = "default_large_query_threshold")]
    pub large_query_threshold: u64,
    /// Elapsed-time guard for the refetch controller.
    #[serde(default = "default_min_refetch_interval_secs")]
    pub min_refetch_interval_secs: u64,
    /// Bucket count the span-only energy overlay heuristic aims for.
    #[serde(default = "default_energy_target_buckets")]
    pub energy_target_buckets: u64,
}

fn default_target_points() -> u64 {
    10_000
}

fn default_large_query_threshold() -> u64 {
    100_000
}

fn default_min_refetch_interval_secs() -> u64 {
    10
}

fn default_energy_target_buckets() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// Visible duration of the rolling window in seconds.
    pub window_secs: u64,
    /// Render tick period; independent of (and usually faster than) the poll period.
    pub render_interval_ms: u64,
    /// Poll period used when a device's registry entry declares none.
    #[serde(default = "default_fallback_poll_interval_ms")]
    pub fallback_poll_interval_ms: u64,
}

fn default_fallback_poll_interval_ms() -> u64 {
    1000
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.data_service.base_url.is_empty(),
            "data_service.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.data_service.request_timeout_secs > 0,
            "data_service.request_timeout_secs must be > 0, got {}",
            self.data_service.request_timeout_secs
        );
        anyhow::ensure!(
            self.chart.target_points > 0,
            "chart.target_points must be > 0, got {}",
            self.chart.target_points
        );
        anyhow::ensure!(
            self.chart.large_query_threshold >= self.chart.target_points,
            "chart.large_query_threshold must be >= chart.target_points, got {}",
            self.chart.large_query_threshold
        );
        anyhow::ensure!(
            self.chart.energy_target_buckets > 0,
            "chart.energy_target_buckets must be > 0, got {}",
            self.chart.energy_target_buckets
        );
        anyhow::ensure!(
            self.live.window_secs > 0,
            "live.window_secs must be > 0, got {}",
            self.live.window_secs
        );
        anyhow::ensure!(
            self.live.render_interval_ms > 0,
            "live.render_interval_ms must be > 0, got {}",
            self.live.render_interval_ms
        );
        anyhow::ensure!(
            self.live.fallback_poll_interval_ms > 0,
            "live.fallback_poll_interval_ms must be > 0, got {}",
            self.live.fallback_poll_interval_ms
        );
        Ok(())
    }
}
