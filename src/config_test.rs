use super::*;
use std::collections::HashMap;

fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    ServerConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn empty_environment_uses_defaults() {
    let cfg = config_from(&[]).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.run_url, None);
    assert_eq!(cfg.analyze_url, None);
    assert_eq!(
        cfg.exec_timeouts,
        ExecTimeouts {
            request_secs: DEFAULT_EXEC_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_EXEC_CONNECT_TIMEOUT_SECS
        }
    );
    assert_eq!(cfg.eviction, EvictionPolicy::Never);
    assert_eq!(cfg.reap_interval, Duration::from_secs(DEFAULT_ROOM_REAP_INTERVAL_SECS));
    assert_eq!(cfg.queue_capacity, DEFAULT_CLIENT_QUEUE_CAPACITY);
    assert_eq!(cfg.static_dir, None);
    assert!(!cfg.has_executor());
}

#[test]
fn overrides_are_parsed() {
    let cfg = config_from(&[
        ("PORT", "8080"),
        ("RUN_URL", "http://runner/run"),
        ("ANALYZE_URL", " http://runner/analyze "),
        ("EXEC_REQUEST_TIMEOUT_SECS", "12"),
        ("EXEC_CONNECT_TIMEOUT_SECS", "3"),
        ("ROOM_IDLE_TIMEOUT_SECS", "600"),
        ("ROOM_REAP_INTERVAL_SECS", "15"),
        ("CLIENT_QUEUE_CAPACITY", "32"),
        ("STATIC_DIR", "public"),
    ])
    .unwrap();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.run_url.as_deref(), Some("http://runner/run"));
    assert_eq!(cfg.analyze_url.as_deref(), Some("http://runner/analyze"));
    assert_eq!(cfg.exec_timeouts, ExecTimeouts { request_secs: 12, connect_secs: 3 });
    assert_eq!(cfg.eviction, EvictionPolicy::IdleAfter(Duration::from_secs(600)));
    assert_eq!(cfg.reap_interval, Duration::from_secs(15));
    assert_eq!(cfg.queue_capacity, 32);
    assert_eq!(cfg.static_dir, Some(PathBuf::from("public")));
    assert!(cfg.has_executor());
}

#[test]
fn invalid_port_is_an_error() {
    let err = config_from(&[("PORT", "http")]).unwrap_err();
    assert_eq!(err, ConfigError::InvalidPort("http".into()));
    assert_eq!(crate::error::ErrorCode::error_code(&err), "E_CONFIG_PORT");
}

#[test]
fn bad_numbers_fall_back_to_defaults() {
    let cfg = config_from(&[("EXEC_REQUEST_TIMEOUT_SECS", "soon"), ("CLIENT_QUEUE_CAPACITY", "-4")]).unwrap();
    assert_eq!(cfg.exec_timeouts.request_secs, DEFAULT_EXEC_REQUEST_TIMEOUT_SECS);
    assert_eq!(cfg.queue_capacity, DEFAULT_CLIENT_QUEUE_CAPACITY);
}

#[test]
fn zero_idle_timeout_means_never() {
    let cfg = config_from(&[("ROOM_IDLE_TIMEOUT_SECS", "0")]).unwrap();
    assert_eq!(cfg.eviction, EvictionPolicy::Never);
}

#[test]
fn zero_queue_capacity_is_clamped() {
    let cfg = config_from(&[("CLIENT_QUEUE_CAPACITY", "0")]).unwrap();
    assert_eq!(cfg.queue_capacity, 1);
}

#[test]
fn blank_urls_are_unset() {
    let cfg = config_from(&[("RUN_URL", "  "), ("STATIC_DIR", "")]).unwrap();
    assert_eq!(cfg.run_url, None);
    assert_eq!(cfg.static_dir, None);
}
