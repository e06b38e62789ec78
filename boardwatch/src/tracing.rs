//! Provide tracing, tailored to this program.
//!
//! The binary calls [`init_journald_or_stderr`] once at startup to install a
//! tracing subscriber. Library code only emits events; it never installs a
//! subscriber itself.
//!
//! The rest of the crate uses `use crate::tracing::prelude::*` for the
//! `trace!()`, `debug!()`, `info!()`, `warn!()`, and `error!()` macros.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging.
///
/// Under systemd, use journald. Otherwise log to stderr, leaving stdout to
/// the command output (JSON lines).
pub fn init_journald_or_stderr() {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(layer)
                .init();
        } else {
            use_stderr();
            error!("Failed to initialize journald logging, using stderr.");
        }
    } else {
        use_stderr();
    }
}

// Filter according to RUST_LOG, overriding the default level (ERROR) to INFO.
fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy()
}

fn use_stderr() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimer),
        )
        .init();
}

// Timestamps in local time to the nearest second; the default timer is UTC
// with sub-second precision, which is noise for a CLI.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", formatted)
    }
}
