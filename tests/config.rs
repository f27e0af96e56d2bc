// tests/config.rs
use daily_brief::config::{AppConfig, ENV_CONFIG_PATH};
use daily_brief::sources::Location;
use std::{env, fs};

const OVERRIDES: [&str; 6] = [
    "OPEN_WEATHER_API_KEY",
    "NEWS_API_KEY",
    "BRIEF_LATITUDE",
    "BRIEF_LONGITUDE",
    "BRIEF_COUNTRY",
    "BRIEF_TTS_COMMAND",
];

fn clear_env() {
    env::remove_var(ENV_CONFIG_PATH);
    for k in OVERRIDES {
        env::remove_var(k);
    }
}

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("assistant.toml");
    fs::write(
        &p_toml,
        r#"
news_api_key = " news "
http_timeout_secs = 3

[location]
latitude = 51.5
longitude = -0.12
country = " GB "
"#,
    )
    .unwrap();
    let t = AppConfig::load_from_file(&p_toml).unwrap();
    assert_eq!(t.news_api_key, "news");
    assert_eq!(t.location.country, "gb");
    assert_eq!(t.http_timeout_secs, 3);
    assert!(t.open_weather_api_key.is_empty());

    let p_json = dir.path().join("assistant.json");
    fs::write(&p_json, r#"{"tts_command": "espeak-ng --stdin"}"#).unwrap();
    let j = AppConfig::load_from_file(&p_json).unwrap();
    assert_eq!(j.tts_command.as_deref(), Some("espeak-ng --stdin"));
    assert_eq!(j.location, Location::default());
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("assistant.json");
    fs::write(&p, "{ not json").unwrap();
    assert!(AppConfig::load_from_file(&p).is_err());
    assert!(AppConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing at all: defaults
    let d = AppConfig::load_default().unwrap();
    assert_eq!(d, AppConfig::default());

    // 2) Fallback JSON, then TOML wins over JSON
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("assistant.json"), r#"{"news_api_key": "from-json"}"#).unwrap();
    assert_eq!(AppConfig::load_default().unwrap().news_api_key, "from-json");

    fs::write(cfg_dir.join("assistant.toml"), r#"news_api_key = "from-toml""#).unwrap();
    assert_eq!(AppConfig::load_default().unwrap().news_api_key, "from-toml");

    // 3) Explicit path takes precedence
    let p_env = tmp.path().join("custom.toml");
    fs::write(&p_env, r#"news_api_key = "from-env-path""#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(AppConfig::load_default().unwrap().news_api_key, "from-env-path");

    // 4) Dangling explicit path is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
    assert!(AppConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_overrides_file_values() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    let p = tmp.path().join("assistant.toml");
    fs::write(
        &p,
        r#"
open_weather_api_key = "file-key"
[location]
country = "de"
"#,
    )
    .unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    env::set_var("OPEN_WEATHER_API_KEY", "env-key");
    env::set_var("BRIEF_LATITUDE", "48.85");
    env::set_var("BRIEF_LONGITUDE", "not a number");
    env::set_var("BRIEF_TTS_COMMAND", "say");

    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.open_weather_api_key, "env-key");
    assert_eq!(cfg.location.latitude, 48.85);
    assert_eq!(cfg.location.longitude, Location::default().longitude);
    assert_eq!(cfg.location.country, "de");
    assert_eq!(cfg.tts_command.as_deref(), Some("say"));

    clear_env();
    env::set_current_dir(&old).unwrap();
}
