//! Logging setup shared by anything embedding the traversal core.

/// Installs an [`env_logger`] subscriber writing to stderr with no
/// timestamps, honoring `RUST_LOG` for level filtering. Safe to call more
/// than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init();
}
