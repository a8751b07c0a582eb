use super::*;

#[test]
fn test_http_error_display() {
    let err = ProviderError::Http {
        status: 401,
        message: "Invalid API key".to_string(),
    };
    assert_eq!(err.to_string(), "HTTP error! status: 401");
    assert_eq!(err.status(), Some(401));
}

#[test]
fn test_status_only_for_http() {
    assert_eq!(ProviderError::Network("refused".to_string()).status(), None);
    assert_eq!(ProviderError::StreamError("reset".to_string()).status(), None);
}

#[test]
fn test_malformed_frame_display() {
    let err = ProviderError::MalformedFrame("not-json".to_string());
    assert!(err.to_string().contains("not-json"));
}

#[test]
fn test_missing_credentials_display() {
    let err = ProviderError::MissingCredentials("Bearer token is not set".to_string());
    assert!(err.to_string().contains("Bearer token"));
}

#[test]
fn test_error_debug() {
    let err = ProviderError::InvalidResponse("empty choices".to_string());
    let debug = format!("{:?}", err);
    assert!(debug.contains("InvalidResponse"));
}
