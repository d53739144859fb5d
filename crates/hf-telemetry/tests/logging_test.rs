use hf_telemetry::logging;

#[test]
fn init_logging_human() {
    // Second call is a no-op.
    logging::init_logging("test-service", "debug");
    logging::init_logging("test-service", "info");

    tracing::info!(key = "value", "human-readable log line");
}

#[test]
fn init_logging_json() {
    // The global subscriber may already be set by another test; this must not panic.
    logging::init_logging_json("test-service-json", "info");

    tracing::info!(key = "value", "json log line");
}

#[test]
fn init_by_format_flag() {
    logging::init("flag-test", "warn", false);
    logging::init("flag-test", "warn", true);
}
