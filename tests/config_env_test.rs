use std::env;
use std::path::PathBuf;
use std::time::Duration;

use kraken::Settings;
use tempfile::TempDir;

#[test]
fn test_env_overrides_nested_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(&config_path, "[server]\nport = 20001\n").unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("KRAKEN_SERVER__RATE_LIMIT", "0.5");
        env::set_var("KRAKEN_TRACKING__SHARE_DIR", "/data/share");
        env::set_var("KRAKEN_MONITOR__SAMPLE_INTERVAL_MS", "250");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("KRAKEN_SERVER__RATE_LIMIT");
        env::remove_var("KRAKEN_TRACKING__SHARE_DIR");
        env::remove_var("KRAKEN_MONITOR__SAMPLE_INTERVAL_MS");
    }

    // file value survives, env fills the rest
    assert_eq!(settings.server.port, 20001);
    assert_eq!(settings.server.rate_limit_interval(), Duration::from_millis(500));
    assert_eq!(settings.tracking.share_dir, PathBuf::from("/data/share"));
    assert_eq!(settings.monitor.sample_interval(), Duration::from_millis(250));
}
