//! Global subscriber installation. Kept in its own test binary so the
//! installed subscriber cannot leak into other tests.

use venntry_api::telemetry::{init_tracer, TelemetryConfig};

#[test]
fn test_second_init_fails() {
    let config = TelemetryConfig {
        json: false,
        ..TelemetryConfig::default()
    };
    assert!(init_tracer(&config).is_ok());
    assert!(init_tracer(&config).is_err());
}
