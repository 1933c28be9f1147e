use super::error::{CodecError, HeaderError, SessionError, TransportError};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("ERROR"), tracing::Level::ERROR);
    assert_eq!(logging::parse_level(" warning "), tracing::Level::WARN);
    assert_eq!(logging::parse_level("trace"), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("verbose"), tracing::Level::INFO);
}

#[test]
fn session_error_messages_include_cause() {
    let err = SessionError::Connection(TransportError::InvalidUrl {
        url: "ftp://x".to_string(),
        reason: "unsupported scheme".to_string(),
    });
    assert_eq!(
        err.to_string(),
        "connection failed: invalid url \"ftp://x\": unsupported scheme"
    );

    let err: SessionError = HeaderError::NotAnObject.into();
    assert!(matches!(err, SessionError::Config(_)));

    let err: SessionError = CodecError::Encode("bad header".to_string()).into();
    assert_eq!(err.to_string(), "cannot encode frame: bad header");
}
