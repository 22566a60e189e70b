use super::*;
use serde_json::json;

#[test]
fn status_mapping() {
    assert_eq!(ClientError::http(403, "forbidden").status(), Some(403));
    assert_eq!(ClientError::SessionExpired.status(), Some(401));
    assert_eq!(ClientError::Transport("refused".into()).status(), None);
    assert_eq!(ClientError::Timeout.status(), None);
}

#[test]
fn auth_failure_classification() {
    assert!(ClientError::SessionExpired.is_auth_failure());
    assert!(ClientError::http(401, "").is_auth_failure());
    assert!(!ClientError::http(403, "").is_auth_failure());
    assert!(!ClientError::http(500, "boom").is_auth_failure());
}

#[test]
fn display_keeps_status_and_body() {
    let e = ClientError::http(422, r#"{"error":"rate must be positive"}"#);
    let s = e.to_string();
    assert!(s.contains("422"));
    assert!(s.contains("rate must be positive"));
    assert_eq!(ClientError::SessionExpired.to_string(), "Session expired");
}

#[test]
fn server_message_extraction() {
    assert_eq!(
        ClientError::http(401, r#"{"error":"Invalid credentials"}"#).server_message().as_deref(),
        Some("Invalid credentials")
    );
    assert_eq!(
        ClientError::http(400, r#"{"message":"email required"}"#).server_message().as_deref(),
        Some("email required")
    );
    assert_eq!(ClientError::http(500, "<html>oops</html>").server_message(), None);
    assert_eq!(ClientError::http(400, r#"{"error":"  "}"#).server_message(), None);
    assert_eq!(ClientError::Timeout.server_message(), None);
}

#[test]
fn codes_are_stable() {
    assert_eq!(ClientError::SessionExpired.code_str(), "session_expired");
    assert_eq!(ClientError::http(500, "").code_str(), "http_error");
    assert_eq!(ClientError::Decode("x".into()).code_str(), "decode_error");
}

#[test]
fn message_field_skips_blank_keys() {
    assert_eq!(message_field(&json!({"msg": "Token has expired"})).as_deref(), Some("Token has expired"));
    assert_eq!(message_field(&json!({"error": " ", "message": "Account disabled"})).as_deref(), Some("Account disabled"));
    assert_eq!(message_field(&json!({"error": 42})), None);
    assert_eq!(message_field(&json!(null)), None);
}
