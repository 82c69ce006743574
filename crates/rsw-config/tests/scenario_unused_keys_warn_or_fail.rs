use rsw_config::{
    load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy, DEFAULTS_YAML,
};

const TYPO_YAML: &str = r#"
nsx:
  retry:
    max_attempt: 3
stores:
  dir: ./lab-state
legacy:
  rest_port: 8443
"#;

#[test]
fn warn_mode_reports_without_error() {
    let loaded = load_layered_yaml_from_strings(&[DEFAULTS_YAML, TYPO_YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/legacy/rest_port".to_string(),
            "/nsx/retry/max_attempt".to_string(),
        ]
    );
}

#[test]
fn fail_mode_errors_and_names_the_keys() {
    let loaded = load_layered_yaml_from_strings(&[DEFAULTS_YAML, TYPO_YAML]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "{msg}");
    assert!(msg.contains("/nsx/retry/max_attempt"), "{msg}");
}

#[test]
fn consumed_keys_are_not_flagged() {
    let yaml = r#"
nsx:
  scheme: http
  retry:
    max_attempts: 2
audit:
  path: /tmp/rsw-audit.jsonl
"#;
    let loaded = load_layered_yaml_from_strings(&[DEFAULTS_YAML, yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean(), "{:?}", report.unused_leaf_pointers);
}
