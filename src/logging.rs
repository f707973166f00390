//! `tracing` subscriber setup for the `ltx` binary.
//!
//! - `RUST_LOG` filter, default `lecture_transcripts=info`
//! - JSON lines when `RUST_LOG_FORMAT=json`, human-readable otherwise
//! - Output on stderr

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "lecture_transcripts=info,tower_http=info";

/// Install the global subscriber. Later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json_requested(std::env::var("RUST_LOG_FORMAT").ok().as_deref()) {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

fn json_requested(format: Option<&str>) -> bool {
    format.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}
