use std::io::Write;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

struct MaestroLogger {
    file: Option<Mutex<std::fs::File>>,
    filter: LevelFilter,
    start: Instant,
}

impl Log for MaestroLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let _ = writeln!(
            std::io::stderr().lock(),
            "[{}] {}",
            record.level(),
            record.args()
        );

        if let Some(ref file) = self.file {
            let elapsed = self.start.elapsed().as_secs_f64();
            let _ = writeln!(
                file.lock(),
                "[{elapsed:.3}s] [{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Resolve the log level: `RUST_LOG` wins, then `--verbose`, then warnings only.
#[must_use]
pub fn level_filter(env_value: Option<&str>, verbose: bool) -> LevelFilter {
    env_value
        .and_then(|s| s.parse().ok())
        .unwrap_or(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
}

/// Initialize the global logger. Must be called once before any logging.
///
/// # Errors
///
/// Returns `SetLoggerError` if a logger was already installed.
pub fn init(verbose: bool, log_file: Option<std::fs::File>) -> Result<(), log::SetLoggerError> {
    let filter = level_filter(std::env::var("RUST_LOG").ok().as_deref(), verbose);

    let logger = MaestroLogger {
        file: log_file.map(Mutex::new),
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_verbose() {
        assert_eq!(level_filter(Some("trace"), false), LevelFilter::Trace);
        assert_eq!(level_filter(Some("error"), true), LevelFilter::Error);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(level_filter(None, false), LevelFilter::Warn);
        assert_eq!(level_filter(None, true), LevelFilter::Debug);
        assert_eq!(level_filter(Some("nonsense"), false), LevelFilter::Warn);
    }
}
