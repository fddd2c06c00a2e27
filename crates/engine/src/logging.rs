//! Logger installation for hosts that do not bring their own subscriber.
//!
//! Maps the engine's legacy level ladder onto `tracing` level filters and
//! installs a `tracing-subscriber` fmt subscriber with an optional file
//! sink and optional console mirror. Hosts already running a subscriber
//! can skip this entirely; the engine only ever emits `tracing` events.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Engine log levels, in the legacy ladder order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[default]
    None,
    Info,
    Error,
    Warning,
    Debug,
}

impl LogLevel {
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "info" => LogLevel::Info,
            "error" => LogLevel::Error,
            "warning" | "warn" => LogLevel::Warning,
            "debug" => LogLevel::Debug,
            _ => LogLevel::None,
        }
    }

    /// The closest `tracing` filter. The legacy ladder cannot express
    /// "info without errors", so `Info` admits errors and warnings too.
    fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Writer fan-out: file sink and/or console mirror.
#[derive(Clone)]
struct LogSink {
    file: Option<Arc<Mutex<File>>>,
    console: bool,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = &self.file {
            file.lock().write_all(buf)?;
        }
        if self.console {
            io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &self.file {
            file.lock().flush()?;
        }
        if self.console {
            io::stdout().flush()?;
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the process-wide logger.
///
/// `log_dir`, when given, receives an `altsound.log` file; `console`
/// mirrors output to stdout. Returns false when the file cannot be
/// created or a subscriber is already installed.
pub fn set_logger(log_dir: Option<&Path>, level: LogLevel, console: bool) -> bool {
    let file = match log_dir {
        Some(dir) => match File::create(dir.join("altsound.log")) {
            Ok(f) => Some(Arc::new(Mutex::new(f))),
            Err(e) => {
                eprintln!("altsound: cannot create log file in {}: {e}", dir.display());
                return false;
            }
        },
        None => None,
    };

    let sink = LogSink { file, console };
    tracing_subscriber::fmt()
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_writer(sink)
        .try_init()
        .is_ok()
}
