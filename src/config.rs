use std::collections::HashMap;

use serde::Deserialize;

use crate::models::NodeInfo;
use crate::series::{ChartOptions, GapParams, PeakParams};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub live: LiveConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    /// Static per-node capacities, keyed by node uuid.
    #[serde(default)]
    pub nodes: HashMap<String, NodeInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    /// Load rows buffered before a write.
    pub flush_rate: u64,
    /// Upper bound on how long buffered rows wait for a write.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_flush_interval_secs() -> u64 {
    10
}

fn default_retention_hours() -> u32 {
    720
}

fn default_prune_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_live_capacity")]
    pub capacity: usize,
    /// Max snapshots held in the broadcast channel for /ws/live (slow clients may lag).
    pub broadcast_capacity: usize,
}

fn default_live_capacity() -> usize {
    crate::live_buffer::DEFAULT_LIVE_CAPACITY
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub max_gap_multiplier: f64,
    pub min_cap_secs: u64,
    pub max_cap_secs: u64,
    pub peak_ratio: f64,
    pub peak_damping: f64,
    /// Ping records kept; bounds the ping chart views.
    pub ping_retention_hours: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        let gap = GapParams::default();
        let peak = PeakParams::default();
        Self {
            max_gap_multiplier: gap.max_gap_multiplier,
            min_cap_secs: (gap.min_cap_ms / 1000) as u64,
            max_cap_secs: (gap.max_cap_ms / 1000) as u64,
            peak_ratio: peak.ratio,
            peak_damping: peak.damping,
            ping_retention_hours: 24,
        }
    }
}

impl ChartConfig {
    pub fn gap_params(&self) -> GapParams {
        GapParams {
            max_gap_multiplier: self.max_gap_multiplier,
            min_cap_ms: self.min_cap_secs as i64 * 1000,
            max_cap_ms: self.max_cap_secs as i64 * 1000,
        }
    }

    pub fn peak_params(&self) -> PeakParams {
        PeakParams {
            ratio: self.peak_ratio,
            damping: self.peak_damping,
        }
    }

    pub fn options(&self, cut_peak: bool) -> ChartOptions {
        ChartOptions {
            gap: self.gap_params(),
            peak: cut_peak.then(|| self.peak_params()),
        }
    }
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

    pub fn node_info(&self, uuid: &str) -> NodeInfo {
        self.nodes.get(uuid).cloned().unwrap_or_default()
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.flush_rate > 0,
            "database.flush_rate must be > 0, got {}",
            self.database.flush_rate
        );
        anyhow::ensure!(
            self.database.flush_interval_secs > 0,
            "database.flush_interval_secs must be > 0, got {}",
            self.database.flush_interval_secs
        );
        anyhow::ensure!(
            self.database.retention_hours > 0,
            "database.retention_hours must be > 0, got {}",
            self.database.retention_hours
        );
        anyhow::ensure!(
            self.database.prune_interval_secs > 0,
            "database.prune_interval_secs must be > 0, got {}",
            self.database.prune_interval_secs
        );
        anyhow::ensure!(
            self.live.capacity > 0,
            "live.capacity must be > 0, got {}",
            self.live.capacity
        );
        anyhow::ensure!(
            self.live.broadcast_capacity > 0,
            "live.broadcast_capacity must be > 0, got {}",
            self.live.broadcast_capacity
        );
        anyhow::ensure!(
            self.chart.max_gap_multiplier.is_finite() && self.chart.max_gap_multiplier > 0.0,
            "chart.max_gap_multiplier must be > 0, got {}",
            self.chart.max_gap_multiplier
        );
        anyhow::ensure!(
            self.chart.min_cap_secs <= self.chart.max_cap_secs,
            "chart.min_cap_secs must be <= chart.max_cap_secs, got {} > {}",
            self.chart.min_cap_secs,
            self.chart.max_cap_secs
        );
        anyhow::ensure!(
            self.chart.peak_ratio.is_finite() && self.chart.peak_ratio >= 1.0,
            "chart.peak_ratio must be >= 1, got {}",
            self.chart.peak_ratio
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.chart.peak_damping),
            "chart.peak_damping must be within 0..=1, got {}",
            self.chart.peak_damping
        );
        anyhow::ensure!(
            self.chart.ping_retention_hours > 0,
            "chart.ping_retention_hours must be > 0, got {}",
            self.chart.ping_retention_hours
        );
        Ok(())
    }
}
