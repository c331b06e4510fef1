//! Logging setup for the type loader
//!
//! The loader logs through the `log` facade; binaries and tests pick a backend
//! here. `env_logger` is the only one wired up.
//!
//! # Log Levels
//!
//! - `warn!` - Suspicious input that is not a diagnostic (over-deep type chains)
//! - `debug!` - Module loads, cancelled builds and retries, reported errors
//! - `trace!` - Individual builds, delayed tasks as they run, structure merges
//!
//! # Environment Variable
//!
//! ```bash
//! RUST_LOG=debug hxtype check project.json
//! RUST_LOG=typeload::tast::class_builder=trace hxtype check project.json
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Warn level; only the first call has any effect
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Reads `RUST_LOG`, falling back to warn
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Maps a `-v` count to a level: 0 warn, 1 info, 2 debug, 3+ trace.
/// `RUST_LOG` wins when set.
pub fn init_for_cli(verbosity: u8) {
    if std::env::var_os("RUST_LOG").is_some() {
        init_from_env();
        return;
    }
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    init_with_level(level);
}

/// Test logger; captured by the harness and safe to call repeatedly
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

pub fn is_initialized() -> bool {
    INIT.is_completed()
}
