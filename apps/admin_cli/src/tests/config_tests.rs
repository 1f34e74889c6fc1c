use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("admin_cli_config_test_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("admin.toml");
    fs::write(&path, contents).expect("write settings");
    path
}

fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn missing_file_yields_defaults() {
    let settings = read_settings_file(Path::new("/definitely/not/here/admin.toml"));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.engine.id_field, "id");
    assert_eq!(settings.engine.temp_id_prefix, "temp");
}

#[test]
fn file_values_and_nested_engine_table_are_read() {
    let path = temp_settings_file(
        r#"
server_url = "https://admin.example.com"
resource = "api/accounts"

[engine]
id_field = "uid"
entity_label = "Account"
"#,
    );

    let settings = read_settings_file(&path);

    assert_eq!(settings.server_url, "https://admin.example.com");
    assert_eq!(settings.resource, "api/accounts");
    assert_eq!(settings.request_timeout_secs, 15);
    assert_eq!(settings.engine.id_field, "uid");
    assert_eq!(settings.engine.temp_id_prefix, "temp");
    assert_eq!(settings.engine.entity_label, "Account");

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let path = temp_settings_file("server_url = [not toml");
    assert_eq!(read_settings_file(&path), Settings::default());
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn environment_overrides_win_and_app_prefix_beats_legacy_name() {
    let mut settings = Settings::default();
    apply_overrides(
        &mut settings,
        overrides(&[
            ("ADMIN_SERVER_URL", "http://legacy:1"),
            ("APP__SERVER_URL", "http://preferred:2"),
            ("APP__RESOURCE", "api/users"),
            ("APP__REQUEST_TIMEOUT_SECS", "3"),
            ("APP__ID_FIELD", "accountId"),
            ("APP__TEMP_ID_PREFIX", "draft"),
            ("APP__ENTITY_LABEL", "User"),
        ]),
    );

    assert_eq!(settings.server_url, "http://preferred:2");
    assert_eq!(settings.resource, "api/users");
    assert_eq!(settings.request_timeout(), Duration::from_secs(3));
    assert_eq!(settings.engine.id_field, "accountId");
    assert_eq!(settings.engine.temp_id_prefix, "draft");
    assert_eq!(settings.engine.entity_label, "User");
}

#[test]
fn invalid_timeout_override_is_ignored() {
    let mut settings = Settings::default();
    apply_overrides(&mut settings, overrides(&[("APP__REQUEST_TIMEOUT_SECS", "soon")]));
    assert_eq!(settings.request_timeout_secs, 15);
}

#[test]
fn zero_timeout_is_clamped() {
    let settings = Settings {
        request_timeout_secs: 0,
        ..Settings::default()
    };
    assert_eq!(settings.request_timeout(), Duration::from_secs(1));
}
