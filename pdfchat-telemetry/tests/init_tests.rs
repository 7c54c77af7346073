//! Global subscriber installation. Kept in its own test binary because the
//! global default can only be set once per process.

use pdfchat_telemetry::{LogFormat, TelemetryConfig, TelemetryError, init, init_telemetry};

#[test]
fn second_init_is_an_error_not_a_panic() {
    init(&TelemetryConfig::new("pdfchat-test").with_format(LogFormat::Json)).unwrap();
    tracing::info!(chunk_count = 1, "after init");

    let again = init_telemetry("pdfchat-test");
    assert!(matches!(again, Err(TelemetryError::Init(_))));
}
