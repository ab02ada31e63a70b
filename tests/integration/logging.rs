// tests/integration/logging.rs

use mtsched::cli::LogLevel;
use mtsched::logging::{DEFAULT_DIRECTIVES, build_filter};

#[test]
fn cli_level_targets_the_crate_and_wins_over_the_environment() {
    let filter = build_filter(Some(LogLevel::Debug), Some("trace")).unwrap();
    let rendered = filter.to_string().to_lowercase();
    assert!(rendered.contains("mtsched=debug"), "{rendered}");
    assert!(!rendered.contains("trace"), "{rendered}");
}

#[test]
fn environment_directives_can_target_single_modules() {
    let filter = build_filter(None, Some("warn,mtsched::engine::static_queue=trace")).unwrap();
    let rendered = filter.to_string().to_lowercase();
    assert!(rendered.contains("mtsched::engine::static_queue=trace"), "{rendered}");
}

#[test]
fn missing_or_blank_environment_uses_the_default() {
    for env in [None, Some(""), Some("   ")] {
        let filter = build_filter(None, env).unwrap();
        let rendered = filter.to_string().to_lowercase();
        assert!(rendered.contains("mtsched=info"), "{env:?}: {rendered}");
    }
    assert!(DEFAULT_DIRECTIVES.contains("mtsched=info"));
}

#[test]
fn malformed_environment_value_is_an_error() {
    let err = build_filter(None, Some("mtsched=loudest")).unwrap_err();
    assert!(err.to_string().contains("MTSCHED_LOG"), "{err}");
}
