/// Map a textual level (as found in configuration or on the command line)
/// to a `tracing` level. Unknown values fall back to `INFO`.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing for the application.
///
/// Output goes to stderr so the interactive console on stdout stays readable.
pub fn init(default_level: &str) {
    // try_init: tests and embedding hosts may call this more than once
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
