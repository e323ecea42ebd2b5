//! Tests for connection configuration loading and parsing

use std::io::Write;

use lakestore::{ConnectionString, Error, LakeConfig};
use secrecy::ExposeSecret;

const SAMPLE: &str =
    "DefaultEndpointsProtocol=https;AccountName=devaccount;AccountKey=a2V5Cg==;EndpointSuffix=core.windows.net";

fn write_config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_new_holds_connection_string() {
    let config = LakeConfig::new(SAMPLE);
    assert_eq!(config.connection_string().expose_secret(), SAMPLE);
}

#[test]
fn test_from_env_var() {
    // A test-private variable name avoids racing parallel tests on the
    // shared STORAGE_CONNECTION_STRING.
    let var = "LAKESTORE_TEST_CONN_FROM_ENV";
    unsafe { std::env::set_var(var, SAMPLE) };

    let config = LakeConfig::from_env_var(var).unwrap();
    assert_eq!(config.connection_string().expose_secret(), SAMPLE);

    unsafe { std::env::remove_var(var) };
}

#[test]
fn test_from_env_var_unset_fails() {
    let result = LakeConfig::from_env_var("LAKESTORE_TEST_CONN_UNSET");
    assert!(matches!(result.unwrap_err(), Error::Config(_)));
}

#[test]
fn test_from_env_var_empty_fails() {
    let var = "LAKESTORE_TEST_CONN_EMPTY";
    unsafe { std::env::set_var(var, "") };

    let result = LakeConfig::from_env_var(var);
    assert!(matches!(result.unwrap_err(), Error::Config(_)));

    unsafe { std::env::remove_var(var) };
}

#[test]
fn test_from_file() {
    let file = write_config_file(&format!(r#"{{ "connection_string": "{SAMPLE}" }}"#));

    let config = LakeConfig::from_file(file.path()).unwrap();
    assert_eq!(config.connection_string().expose_secret(), SAMPLE);
}

#[test]
fn test_from_file_missing_fails_with_io() {
    let result = LakeConfig::from_file("/nonexistent/lakestore.json");
    assert!(matches!(result.unwrap_err(), Error::Io(_)));
}

#[test]
fn test_from_file_invalid_json_fails() {
    let file = write_config_file("not json at all");

    let result = LakeConfig::from_file(file.path());
    assert!(matches!(result.unwrap_err(), Error::Config(_)));
}

#[test]
fn test_from_file_empty_connection_string_fails() {
    let file = write_config_file(r#"{ "connection_string": "" }"#);

    let result = LakeConfig::from_file(file.path());
    assert!(matches!(result.unwrap_err(), Error::Config(_)));
}

#[test]
fn test_load_falls_back_to_file() {
    if std::env::var(lakestore::config::CONNECTION_STRING_VAR).is_ok() {
        // The environment would win; nothing to test here.
        return;
    }
    let file = write_config_file(&format!(r#"{{ "connection_string": "{SAMPLE}" }}"#));

    let config = LakeConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.connection_string().expose_secret(), SAMPLE);
}

#[test]
fn test_load_with_nothing_fails() {
    if std::env::var(lakestore::config::CONNECTION_STRING_VAR).is_ok() {
        return;
    }
    let result = LakeConfig::load(None);
    assert!(matches!(result.unwrap_err(), Error::Config(_)));
}

#[test]
fn test_debug_redacts_connection_string() {
    let config = LakeConfig::new(SAMPLE);
    let debug_output = format!("{config:?}");
    assert!(debug_output.contains("redacted"));
    assert!(!debug_output.contains("devaccount"));
}

#[test]
fn test_parse_connection_string() {
    let parsed = ConnectionString::parse(SAMPLE).unwrap();

    assert_eq!(parsed.get("AccountName"), Some("devaccount"));
    assert_eq!(parsed.get("DefaultEndpointsProtocol"), Some("https"));
    assert_eq!(parsed.get("EndpointSuffix"), Some("core.windows.net"));
    assert_eq!(parsed.get("Missing"), None);
}

#[test]
fn test_parse_keeps_equals_inside_values() {
    let parsed = ConnectionString::parse(SAMPLE).unwrap();
    // Base64 padding survives the split on the first '='.
    assert_eq!(parsed.get("AccountKey"), Some("a2V5Cg=="));
}

#[test]
fn test_parse_ignores_empty_segments() {
    let parsed = ConnectionString::parse("A=1;;B=2;").unwrap();
    assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["A", "B"]);
}

#[test]
fn test_parse_empty_fails() {
    assert!(matches!(
        ConnectionString::parse("").unwrap_err(),
        Error::Config(_)
    ));
    assert!(matches!(
        ConnectionString::parse(";;").unwrap_err(),
        Error::Config(_)
    ));
}

#[test]
fn test_parse_segment_without_equals_fails() {
    let result = ConnectionString::parse("AccountName");
    assert!(matches!(result.unwrap_err(), Error::Config(_)));
}

#[test]
fn test_connection_string_debug_hides_values() {
    let parsed = ConnectionString::parse(SAMPLE).unwrap();
    let debug_output = format!("{parsed:?}");
    assert!(debug_output.contains("AccountName"));
    assert!(!debug_output.contains("devaccount"));
}

#[test]
fn test_parsed_via_config() {
    let config = LakeConfig::new(SAMPLE);
    let parsed = config.parsed().unwrap();
    assert_eq!(parsed.get("AccountName"), Some("devaccount"));
}
