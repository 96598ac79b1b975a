// Shared test helpers

#![allow(dead_code)]

use probechart::config::AppConfig;
use probechart::history_repo::HistoryRepo;
use probechart::models::*;
use tempfile::TempDir;

pub const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/test.db"
flush_rate = 5

[live]
capacity = 150
broadcast_capacity = 10

[nodes.node-a]
mem_total = 1000
disk_total = 4000
traffic_limit = 1000
traffic_limit_type = "sum"
"#;

pub fn test_app_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

/// Repo backed by a fresh file in a temp dir. Keep the TempDir alive for the test.
pub async fn temp_repo() -> (TempDir, HistoryRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 720, 24)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

/// RFC 3339 rendering of `ms`, millisecond precision.
pub fn rfc3339(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn probe(task_id: u32, ms: i64, value: f64) -> ProbeRecord {
    ProbeRecord {
        task_id,
        time: rfc3339(ms),
        value,
    }
}

pub fn report(ms: i64, cpu: f64, ram_used: u64) -> NodeReport {
    NodeReport {
        cpu: CpuReport { usage: cpu },
        ram: UsedReport { used: ram_used },
        swap: UsedReport::default(),
        disk: UsedReport { used: 1000 },
        network: NetworkReport {
            up: 10.0,
            down: 20.0,
            total_up: 100,
            total_down: 150,
        },
        load: LoadReport {
            load1: 0.5,
            load5: 0.4,
            load15: 0.3,
        },
        connections: ConnectionsReport { tcp: 12, udp: 3 },
        process: 80,
        uptime: 3600,
        updated_at: rfc3339(ms),
    }
}
