//! Diagnostics sinks for binaries and examples.
//!
//! The library itself only emits `log` records. A binary installs either
//! the stderr sink from [`init_with_level`], which writes lines such as
//! `[   0.012s DEBUG] planar_measure_core::slot: planar calibration installed`,
//! or, with the `tracing` feature, a `tracing-subscriber` via `init_tracing`.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Level used when a level name cannot be parsed.
pub const FALLBACK_LEVEL: LevelFilter = LevelFilter::Warn;

/// Parse a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`),
/// case-insensitively. Unknown names give [`FALLBACK_LEVEL`].
pub fn level_from_name(name: &str) -> LevelFilter {
    LevelFilter::from_str(name.trim()).unwrap_or(FALLBACK_LEVEL)
}

/// Filter directive for the tracing subscriber: a non-empty `RUST_LOG`
/// wins, otherwise the requested level name is used.
pub fn filter_directive(rust_log: Option<&str>, level: &str) -> String {
    match rust_log.map(str::trim) {
        Some(env) if !env.is_empty() => env.to_string(),
        _ => level_from_name(level).to_string().to_lowercase(),
    }
}

struct StderrSink {
    max: LevelFilter,
    since: Instant,
}

impl Log for StderrSink {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let secs = self.since.elapsed().as_secs_f64();
        let mut out = std::io::stderr().lock();
        let _ = writeln!(
            out,
            "[{secs:8.3}s {:<5}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static SINK: OnceLock<StderrSink> = OnceLock::new();

/// Route `log` records at or above `level` to stderr.
///
/// The sink is installed once; repeated calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if SINK.get().is_some() {
        return Ok(());
    }
    let sink = SINK.get_or_init(|| StderrSink {
        max: level,
        since: Instant::now(),
    });
    log::set_logger(sink)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber on stderr.
///
/// `level` seeds the filter unless `RUST_LOG` is set (see [`filter_directive`]).
#[cfg(feature = "tracing")]
pub fn init_tracing(level: &str, json: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(filter_directive(rust_log.as_deref(), level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL.to_string().to_lowercase()));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(fmt::time::Uptime::default())
            .with_target(true)
            .finish()
            .try_init();
    }
}
