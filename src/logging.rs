//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
//! with `--verbose`. Output goes to stderr through a non-blocking writer, so
//! the returned guard must be held until the process exits.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

pub fn init(verbose: bool, json: bool) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    guard
}
