use super::*;

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_dir(label: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("lounge_server_{label}_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    dir
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(Path::new("/nonexistent/server.toml"), no_env);

    assert_eq!(settings.server_bind, "127.0.0.1:8080");
    assert_eq!(settings.bot_api_url, "https://api.telegram.org");
    assert_eq!(settings.currency, "ETB");
    assert_eq!(settings.bot_token, None);
    assert!(settings.staff_chat().is_err());
    assert_eq!(
        settings.retry_policy(),
        RetryPolicy::new(3, Duration::from_secs(1))
    );
}

#[test]
fn file_values_are_overridden_by_env_and_prefixed_env_wins() {
    let dir = temp_dir("layers");
    let path = dir.join("server.toml");
    fs::write(
        &path,
        "staff_chat_id = \"-1001\"\nvenue_name = \"Rooftop\"\nnotify_max_attempts = \"5\"\n",
    )
    .expect("write config");

    let vars = HashMap::from([
        ("GROUP_ID", "-2002"),
        ("APP__STAFF_CHAT_ID", "-3003"),
        ("BOT_TOKEN", "123:abc"),
        ("NOTIFY_BASE_DELAY_MS", "250"),
    ]);
    let settings = load_settings_from(&path, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.staff_chat().expect("staff chat"), ChatId(-3003));
    assert_eq!(settings.venue().name, "Rooftop");
    assert_eq!(settings.bot_token.as_deref(), Some("123:abc"));
    assert_eq!(
        settings.retry_policy(),
        RetryPolicy::new(5, Duration::from_millis(250))
    );

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn invalid_numbers_are_ignored() {
    let vars = HashMap::from([
        ("GROUP_ID", "not-a-number"),
        ("NOTIFY_MAX_ATTEMPTS", "lots"),
    ]);
    let settings = load_settings_from(Path::new("/nonexistent/server.toml"), |key| {
        vars.get(key).map(|v| v.to_string())
    });

    assert_eq!(settings.staff_chat_id, None);
    assert_eq!(settings.notify_max_attempts, 3);
}

#[test]
fn blank_token_means_no_token() {
    let vars = HashMap::from([("BOT_TOKEN", "  ")]);
    let settings = load_settings_from(Path::new("/nonexistent/server.toml"), |key| {
        vars.get(key).map(|v| v.to_string())
    });
    assert_eq!(settings.bot_token, None);
}

#[test]
fn catalog_falls_back_to_default_menu() {
    let settings = Settings::default();
    let catalog = settings.load_catalog().expect("catalog");
    assert!(catalog.category("drinks").is_ok());
}

#[test]
fn catalog_is_loaded_from_configured_path() {
    let dir = temp_dir("catalog");
    let path = dir.join("menu.toml");
    fs::write(
        &path,
        "[[category]]\nname = \"Snacks\"\n\n[[category.items]]\nname = \"Popcorn\"\nprice = 4\ndescription = \"Salted\"\n",
    )
    .expect("write catalog");

    let settings = Settings {
        catalog_path: Some(path),
        ..Settings::default()
    };
    let catalog = settings.load_catalog().expect("catalog");
    assert_eq!(catalog.categories().len(), 1);
    assert_eq!(catalog.categories()[0].items[0].name, "Popcorn");

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn missing_catalog_file_is_an_error() {
    let settings = Settings {
        catalog_path: Some(PathBuf::from("/nonexistent/menu.toml")),
        ..Settings::default()
    };
    assert!(settings.load_catalog().is_err());
}
