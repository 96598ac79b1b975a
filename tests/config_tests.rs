// Config loading and validation tests

use probechart::config::AppConfig;
use probechart::models::TrafficLimitType;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/server.db"
flush_rate = 10
retention_hours = 168
prune_interval_secs = 600

[live]
capacity = 150
broadcast_capacity = 60

[chart]
max_gap_multiplier = 6.0
min_cap_secs = 120
max_cap_secs = 1800
peak_ratio = 1.5
peak_damping = 0.2
ping_retention_hours = 24

[nodes.abc]
mem_total = 2048
traffic_limit = 100
traffic_limit_type = "max"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.path, "data/server.db");
    assert_eq!(config.database.flush_rate, 10);
    assert_eq!(config.database.retention_hours, 168);
    assert_eq!(config.live.broadcast_capacity, 60);
    assert_eq!(config.chart.ping_retention_hours, 24);

    let node = config.node_info("abc");
    assert_eq!(node.mem_total, 2048);
    assert_eq!(node.traffic_limit_type, TrafficLimitType::Max);
    assert_eq!(config.node_info("unknown").mem_total, 0);
}

#[test]
fn test_config_defaults_apply() {
    let minimal = r#"
[server]
port = 8081
host = "127.0.0.1"

[database]
path = "data/server.db"
flush_rate = 10

[live]
broadcast_capacity = 8
"#;
    let config = AppConfig::load_from_str(minimal).expect("load_from_str");
    assert_eq!(config.database.retention_hours, 720);
    assert_eq!(config.database.prune_interval_secs, 3600);
    assert_eq!(config.database.flush_interval_secs, 10);
    assert_eq!(config.live.capacity, 150);
    assert!(config.nodes.is_empty());

    let gap = config.chart.gap_params();
    assert_eq!(gap.max_gap_multiplier, 6.0);
    assert_eq!(gap.min_cap_ms, 120_000);
    assert_eq!(gap.max_cap_ms, 1_800_000);
    assert!(config.chart.options(false).peak.is_none());
    assert_eq!(config.chart.options(true).peak.map(|p| p.ratio), Some(1.5));
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/server.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_flush_rate_zero() {
    let bad = VALID_CONFIG.replace("flush_rate = 10", "flush_rate = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("flush_rate"));
}

#[test]
fn test_config_validation_rejects_retention_zero() {
    let bad = VALID_CONFIG.replace("retention_hours = 168", "retention_hours = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.retention_hours"));
}

#[test]
fn test_config_validation_rejects_live_capacity_zero() {
    let bad = VALID_CONFIG.replace("capacity = 150", "capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("live.capacity"));
}

#[test]
fn test_config_validation_rejects_broadcast_capacity_zero() {
    let bad = VALID_CONFIG.replace("broadcast_capacity = 60", "broadcast_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("broadcast_capacity"));
}

#[test]
fn test_config_validation_rejects_inverted_caps() {
    let bad = VALID_CONFIG.replace("max_cap_secs = 1800", "max_cap_secs = 60");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("chart.min_cap_secs"));
}

#[test]
fn test_config_validation_rejects_bad_peak_params() {
    let bad = VALID_CONFIG.replace("peak_ratio = 1.5", "peak_ratio = 0.5");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("chart.peak_ratio"));

    let bad = VALID_CONFIG.replace("peak_damping = 0.2", "peak_damping = 1.5");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("chart.peak_damping"));
}

#[test]
fn test_config_rejects_unknown_traffic_limit_type() {
    let bad = VALID_CONFIG.replace("traffic_limit_type = \"max\"", "traffic_limit_type = \"avg\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_missing_section_is_error() {
    let bad = VALID_CONFIG.replace("[live]", "[other]");
    assert!(AppConfig::load_from_str(&bad).is_err());
}
