use std::fs;

use tickoff::config::{Config, CONFIG_FILE};
use tickoff::Category;

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_from_dir(dir.path());

    assert_eq!(config.tasks.default_category, Category::Others);
    assert_eq!(config.stats.recent_window_days, 7);
    assert_eq!(config.session.guest_id, "guest");
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[tasks]
default_category = "health"

[stats]
recent_window_days = 14
"#;
    fs::write(dir.path().join(CONFIG_FILE), toml)?;

    let config = Config::load_from_dir(dir.path());
    assert_eq!(config.tasks.default_category, Category::Health);
    assert_eq!(config.stats.recent_window_days, 14);
    assert_eq!(config.session.guest_id, "guest");
    Ok(())
}

#[test]
fn config_save_then_load() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = Config::path_in(dir.path());
    let mut config = Config::default();
    config.session.guest_id = "visitor".to_string();
    config.save(&path)?;

    let loaded = Config::load(&path)?;
    assert_eq!(loaded.session.guest_id, "visitor");
    Ok(())
}
