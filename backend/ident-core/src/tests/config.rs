// Unit tests for IdentConfig loading and validation

use crate::config::{DEFAULT_TIMEOUT_SECS, IdentConfig};
use crate::error::config::ConfigError;
use crate::protocol::DEFAULT_IDENT_PORT;
use crate::{IDENT_PORT_ENV, IDENT_TIMEOUT_SECS_ENV};

use std::time::Duration;

use tempfile::TempDir;

/// **VALUE**: Verifies a missing config file yields port 113 and the default timeout.
///
/// **WHY THIS MATTERS**: Most deployments never write a config file; they must still
/// talk to the standard ident port.
#[test]
fn given_no_config_file_when_loading_then_returns_defaults() {
    // GIVEN: An empty directory
    let dir = TempDir::new().unwrap();

    // WHEN: Loading
    let config = IdentConfig::load(dir.path()).unwrap();

    // THEN: Defaults
    assert_eq!(config.port, DEFAULT_IDENT_PORT);
    assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
}

/// **VALUE**: Verifies both tunables are read from ident.toml, with missing keys defaulted.
#[test]
fn given_partial_toml_when_loading_then_merges_with_defaults() {
    // GIVEN: A file setting only the timeout
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("ident.toml"), "timeout_secs = 4\n").unwrap();

    // WHEN: Loading
    let config = IdentConfig::load(dir.path()).unwrap();

    // THEN: Timeout from file, port default
    assert_eq!(config.timeout_secs, 4);
    assert_eq!(config.port, DEFAULT_IDENT_PORT);
}

/// **VALUE**: Verifies a corrupt file is an error, not a silent fallback.
///
/// **BUG THIS CATCHES**: Would catch parse failures being swallowed, leaving operators
/// wondering why their port setting is ignored.
#[test]
fn given_invalid_toml_when_loading_then_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("ident.toml"), "port = \"not a number\"").unwrap();

    let result = IdentConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies out-of-range values are rejected.
#[test]
fn given_out_of_range_values_when_validated_then_validation_error() {
    for config in [
        IdentConfig::new(0, 2),
        IdentConfig::new(113, 0),
        IdentConfig::new(113, 301),
    ] {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{config:?} should be invalid"
        );
    }
}

/// **VALUE**: Verifies environment-style overrides replace file values and are validated.
#[test]
fn given_overrides_when_applied_then_replace_values() {
    // GIVEN: Defaults and an override source
    let mut config = IdentConfig::default();
    let lookup = |name: &str| match name {
        n if n == IDENT_PORT_ENV => Some(String::from("1113")),
        n if n == IDENT_TIMEOUT_SECS_ENV => Some(String::from(" 4 ")),
        _ => None,
    };

    // WHEN: Applying
    config.apply_overrides(lookup).unwrap();

    // THEN: Overridden
    assert_eq!(config, IdentConfig::new(1113, 4));
}

/// **VALUE**: Verifies a garbage override is reported rather than ignored.
#[test]
fn given_non_numeric_override_when_applied_then_validation_error() {
    let mut config = IdentConfig::default();

    let result = config.apply_overrides(|name: &str| {
        (name == IDENT_PORT_ENV).then(|| String::from("ident"))
    });

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}
