// Unit tests for error module
// Tests serialization (used by --json) and conversions from library errors

use crate::error::IdentcheckError;

use ident_core::{ConfigError, IdentError, IdentityError};
use models::ErrorToken;

use common::ErrorLocation;

/// **VALUE**: Tests that errors can be serialized.
///
/// **WHY THIS MATTERS**: Scripts driving `identcheck --json` need structured errors,
/// not opaque strings.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or adds a non-serializable field (e.g. a raw `io::Error`).
#[test]
fn given_identcheck_error_when_serialized_then_succeeds() {
    // GIVEN: An IdentcheckError
    let err = IdentcheckError::Identcheck {
        message: String::from("Test"),
        location: ErrorLocation::here(),
    };

    // WHEN: Serializing to JSON
    let result = serde_json::to_string(&err);

    // THEN: Should succeed
    assert!(result.is_ok(), "Error should be serializable");

    // AND: Should contain the error data
    let json = result.unwrap();
    assert!(json.contains("Identcheck"), "JSON should contain variant name");
    assert!(json.contains("Test"), "JSON should contain message");
}

/// **VALUE**: Verifies library errors keep their message when converted.
///
/// **BUG THIS CATCHES**: Would catch a conversion that drops the ident error token, leaving
/// operators with "Core Error" and nothing else.
#[test]
fn given_protocol_error_with_token_when_converted_then_core_variant_keeps_token() {
    // GIVEN: A server-reported protocol error
    let ident = IdentError::server_reported(ErrorToken::NoUser);

    // WHEN: Converting
    let err: IdentcheckError = ident.into();

    // THEN: Core variant mentioning NO-USER
    match &err {
        IdentcheckError::Core { message, .. } => assert!(message.contains("NO-USER"), "{message}"),
        other => panic!("Expected Core variant, got {other:?}"),
    }
}

#[test]
fn given_identity_and_config_errors_when_converted_then_mapped_to_own_variants() {
    let identity: IdentcheckError = IdentityError::unresolved("nobody").into();
    let config: IdentcheckError = ConfigError::ValidationError {
        location: ErrorLocation::here(),
        reason: String::from("Ident port cannot be 0"),
    }
    .into();

    assert!(matches!(identity, IdentcheckError::Identity { .. }));
    assert!(matches!(config, IdentcheckError::Config { .. }));
    assert!(config.to_string().starts_with("Config Error:"));
}
