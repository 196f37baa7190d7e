//! Process-level logging configuration.
//!
//! Mirrors the way the donor workspace's binaries wire up `env_logger`:
//! one explicit init call in `main`, with `--debug` raising the default
//! filter from `info` to `debug` rather than introducing a second logging
//! facility.

use env_logger::Builder;
use log::LevelFilter;

/// Initialize the global logger. Safe to call once per process; a second
/// call is a no-op (errors from `env_logger::Builder::try_init` are
/// swallowed since tests may initialize more than once).
pub fn init_logging(debug: bool) {
    let mut builder = Builder::from_default_env();
    let default_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    builder.filter_level(default_level);
    let _ = builder.try_init();
}
