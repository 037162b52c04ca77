//! Logging to the console and to an optional log file.
//!
//! The file layer writes through a [`LogFileSink`] that starts detached: the
//! log file path is only known once the configuration has been resolved, and
//! it is reopened on SIGHUP so external rotation works.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use thiserror::Error;
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to set default subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
    #[error("Failed to initialize LogTracer: {0}")]
    LogTracer(#[from] log::SetLoggerError),
}

#[derive(Debug, Default)]
struct SinkState {
    path: Option<PathBuf>,
    file: Option<File>,
}

/// Log file that can be attached after logging is initialized.
///
/// Writes are dropped while no file is attached.
#[derive(Debug, Clone, Default)]
pub struct LogFileSink {
    inner: Arc<Mutex<SinkState>>,
}

impl LogFileSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` in append mode and send file output there.
    pub fn attach(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let file = open_append(path)?;
        let mut state = self.inner.lock();
        state.path = Some(path.to_path_buf());
        state.file = Some(file);
        Ok(())
    }

    /// Reopen the attached file, for log rotation.
    pub fn reopen(&self) -> io::Result<()> {
        let mut state = self.inner.lock();
        if let Some(path) = state.path.clone() {
            state.file = Some(open_append(&path)?);
        }
        Ok(())
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.lock().path.clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().file.is_some()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writer handed out by [`LogFileSink`] for each event.
pub struct SinkWriter {
    inner: Arc<Mutex<SinkState>>,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.lock().file.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFileSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Filter directive for the `-v`/`-q` balance.
pub fn level_for(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize console and file logging. `RUST_LOG` overrides `verbosity`.
pub fn init_logging(verbosity: i8) -> Result<LogFileSink, LoggingError> {
    let sink = LogFileSink::new();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_timer(LocalTimeTimer),
        )
        .with(
            fmt::layer()
                .with_writer(sink.clone())
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_timer(LocalTimeTimer),
        );

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    Ok(sink)
}

#[derive(Debug, Clone, Copy)]
struct LocalTimeTimer;

impl fmt::time::FormatTime for LocalTimeTimer {
    fn format_time(&self, w: &mut fmt::format::Writer) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}
