//! Logger setup for the `kestrel` binary

/// Install `env_logger` with `level` as the default filter.
///
/// `RUST_LOG` wins when set. Calling this twice is harmless.
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}
