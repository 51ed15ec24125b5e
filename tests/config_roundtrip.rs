//! Default config write/load/validate round-trip.

use rubybot::config::Config;

#[tokio::test]
async fn create_default_then_load_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let config = Config::load(path).await.unwrap();

    assert_eq!(config.route.kills_per_square, 10);
    assert_eq!(config.combat.heal_threshold_pct, 85.0);
    assert_eq!(config.combat.mana_threshold_pct, 50.0);
    assert_eq!(config.recovery.potion_target, 300);
    assert_eq!(config.api.min_request_gap_ms, 1000);

    // A fresh default config has no token yet.
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn edited_config_validates_and_reloads() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    let content = content.replace("token = \"\"", "token = \"session-token\"");
    std::fs::write(path, content).unwrap();

    let config = Config::load(path).await.unwrap();
    assert_eq!(config.api.token, "session-token");
    config.validate().unwrap();
}

#[tokio::test]
async fn partial_config_fills_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");

    std::fs::write(
        &path,
        r#"
[api]
base_url = "https://ruby-king.ru/api"
token = "tok"

[combat]
heal_threshold_pct = 90.0
mana_threshold_pct = 60.0
skill_hp_threshold = 120
skill_id = "sk_2"
low_damage_ratio = 0.4
low_damage_window = 4
min_potion_stock = 20
"#,
    )
    .unwrap();

    let config = Config::load(path.to_str().unwrap()).await.unwrap();
    assert_eq!(config.combat.heal_threshold_pct, 90.0);
    assert_eq!(config.combat.low_damage_window, 4);
    // Untouched sections keep their defaults.
    assert_eq!(config.route.kills_per_square, 10);
    assert_eq!(config.recovery.potion_target, 300);
    config.validate().unwrap();
}
