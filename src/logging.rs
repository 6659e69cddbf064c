//! Logger setup and phase timing helpers.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize the logger with elapsed-time formatting.
///
/// Verbose raises the level to Info, otherwise Warn. Output goes to stderr
/// as `[HH:MM:SS] LEVEL: message`, with the timestamp measuring time since
/// startup.
pub fn init_logger(verbose: bool) {
    START_TIME.set(Instant::now()).ok();

    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format(|buf, record| {
            let elapsed = START_TIME.get().map(|t| t.elapsed()).unwrap_or_default();
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                elapsed.as_secs() / 3600,
                (elapsed.as_secs() % 3600) / 60,
                elapsed.as_secs() % 60,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok();
}

/// Render a millisecond duration as `h/min/s/ms`, dropping leading zero
/// units.
pub fn format_duration_ms(millis: u128) -> String {
    let total_seconds = millis / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;
    let remainder_ms = millis % 1000;

    if hours > 0 {
        format!("{}h {}min {}s {}ms", hours, minutes, seconds, remainder_ms)
    } else if minutes > 0 {
        format!("{}min {}s {}ms", minutes, seconds, remainder_ms)
    } else {
        format!("{}s {}ms", seconds, remainder_ms)
    }
}

/// Log a phase duration at info level.
pub fn log_timing(label: &str, millis: u128) {
    log::info!("{} time: {}", label, format_duration_ms(millis));
}
