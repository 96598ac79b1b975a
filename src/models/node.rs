// Live node reports (push payload) and static node capacities

use serde::{Deserialize, Serialize};

use super::LiveSnapshot;

/// Series keys carried by load rows, in chart order.
pub const LOAD_KEYS: [&str; 11] = [
    "cpu",
    "ram",
    "swap",
    "disk",
    "net_in",
    "net_out",
    "load",
    "process",
    "connections",
    "net_total_up",
    "net_total_down",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuReport {
    pub usage: f64,
}

/// Used bytes of a capacity-bounded resource (RAM, swap, disk).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsedReport {
    pub used: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkReport {
    /// Upload rate, bytes/sec.
    pub up: f64,
    /// Download rate, bytes/sec.
    pub down: f64,
    #[serde(default)]
    pub total_up: u64,
    #[serde(default)]
    pub total_down: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub load1: f64,
    #[serde(default)]
    pub load5: f64,
    #[serde(default)]
    pub load15: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionsReport {
    pub tcp: u32,
    #[serde(default)]
    pub udp: u32,
}

/// One live push for one node. `updated_at` is RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub cpu: CpuReport,
    pub ram: UsedReport,
    #[serde(default)]
    pub swap: UsedReport,
    #[serde(default)]
    pub disk: UsedReport,
    #[serde(default)]
    pub network: NetworkReport,
    #[serde(default)]
    pub load: LoadReport,
    #[serde(default)]
    pub connections: ConnectionsReport,
    #[serde(default)]
    pub process: u32,
    #[serde(default)]
    pub uptime: u64,
    #[serde(alias = "updated_at")]
    pub updated_at: String,
}

impl NodeReport {
    /// Flatten into a load row keyed by [`LOAD_KEYS`]. `None` when `updated_at` is unusable.
    pub fn to_snapshot(&self) -> Option<LiveSnapshot> {
        let timestamp = crate::series::sentinel::parse_timestamp(&self.updated_at)?;
        Some(
            LiveSnapshot::new(timestamp)
                .with("cpu", Some(self.cpu.usage))
                .with("ram", Some(self.ram.used as f64))
                .with("swap", Some(self.swap.used as f64))
                .with("disk", Some(self.disk.used as f64))
                .with("net_in", Some(self.network.down))
                .with("net_out", Some(self.network.up))
                .with("load", Some(self.load.load1))
                .with("process", Some(self.process as f64))
                .with("connections", Some(self.connections.tcp as f64))
                .with("net_total_up", Some(self.network.total_up as f64))
                .with("net_total_down", Some(self.network.total_down as f64)),
        )
    }
}

/// How traffic is counted against a node's traffic limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLimitType {
    Max,
    Min,
    #[default]
    Sum,
    Up,
    Down,
}

/// Static per-node capacities used to turn byte counts into percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    pub mem_total: u64,
    pub swap_total: u64,
    pub disk_total: u64,
    pub traffic_limit: u64,
    pub traffic_limit_type: TrafficLimitType,
}

/// A live snapshot tagged with the node it came from (broadcast + history writer payload).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub entity: String,
    pub snapshot: LiveSnapshot,
}
