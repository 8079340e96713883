//! Logging setup for the tapeout binary.
//!
//! Two sinks are installed: a size-rotated log file under the caller's log
//! directory and stderr. The file always receives the full filter; stderr
//! only carries warnings unless verbose output was requested, so stdout and
//! stderr stay usable for command output.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "tapeout=info,tapeout_db=info";
const QUIET_CONSOLE_FILTER: &str = "warn";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for a binary.
pub struct LogConfig<'a> {
    /// Base name of the log file (`<app_name>.log`).
    pub app_name: &'a str,
    /// Directory holding the current and rotated log files.
    pub log_dir: PathBuf,
    /// Mirror the full filter to stderr instead of warnings only.
    pub verbose: bool,
}

/// Install the global tracing subscriber.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!(
            "Failed to create logs directory: {}",
            config.log_dir.display()
        )
    })?;
    let file_writer = SharedRotatingWriter::new(&config.log_dir, config.app_name)
        .context("Failed to initialize rotating log writer")?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    } else {
        EnvFilter::new(QUIET_CONSOLE_FILTER)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(())
}

/// Path of the active log file for `app_name` inside `log_dir`.
pub fn log_file_path(log_dir: &Path, app_name: &str) -> PathBuf {
    log_dir.join(format!("{}.log", sanitize_name(app_name)))
}

/// Appends to `<base>.log`, shifting it to `<base>.log.1 .. .N` once it
/// would grow past `max_size`.
struct RotatingFile {
    dir: PathBuf,
    base_name: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    written: u64,
}

impl RotatingFile {
    fn open(dir: &Path, base_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut rotating = Self {
            dir: dir.to_path_buf(),
            base_name: sanitize_name(base_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            written: 0,
        };
        rotating.reopen()?;
        if rotating.written > rotating.max_size {
            rotating.rotate()?;
        }
        Ok(rotating)
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn numbered_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, index))
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.active_path())?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
        self.shift_numbered_files()?;
        self.reopen()
    }

    fn shift_numbered_files(&self) -> io::Result<()> {
        let last = self.max_files.saturating_sub(1);
        if last == 0 {
            // Single-file mode: truncate by removing the active file.
            let active = self.active_path();
            if active.exists() {
                fs::remove_file(active)?;
            }
            return Ok(());
        }

        let oldest = self.numbered_path(last);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for idx in (1..last).rev() {
            let from = self.numbered_path(idx);
            if from.exists() {
                fs::rename(&from, self.numbered_path(idx + 1))?;
            }
        }
        let active = self.active_path();
        if active.exists() {
            fs::rename(active, self.numbered_path(1))?;
        }
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
struct SharedRotatingWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

impl SharedRotatingWriter {
    fn new(dir: &Path, base_name: &str) -> Result<Self> {
        let file = RotatingFile::open(dir, base_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", base_name))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRotatingWriter {
    type Writer = SharedRotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for SharedRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .flush()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_name("tapeout"), "tapeout");
        assert_eq!(sanitize_name("../evil name"), "___evil_name");
    }

    #[test]
    fn log_file_path_uses_sanitized_name() {
        let dir = Path::new("/tmp/logs");
        assert_eq!(
            log_file_path(dir, "tape out"),
            PathBuf::from("/tmp/logs/tape_out.log")
        );
    }

    #[test]
    fn rotates_when_size_exceeded() {
        let tmp = TempDir::new().unwrap();
        let mut file = RotatingFile::open(tmp.path(), "app", 3, 16).unwrap();

        file.write_all(b"0123456789").unwrap();
        file.write_all(b"abcdefghij").unwrap();
        file.write_all(b"ABCDEFGHIJ").unwrap();
        file.flush().unwrap();

        let active = fs::read_to_string(tmp.path().join("app.log")).unwrap();
        let first = fs::read_to_string(tmp.path().join("app.log.1")).unwrap();
        let second = fs::read_to_string(tmp.path().join("app.log.2")).unwrap();
        assert_eq!(active, "ABCDEFGHIJ");
        assert_eq!(first, "abcdefghij");
        assert_eq!(second, "0123456789");
    }

    #[test]
    fn keeps_at_most_max_files() {
        let tmp = TempDir::new().unwrap();
        let mut file = RotatingFile::open(tmp.path(), "app", 2, 4).unwrap();

        for chunk in [b"aaaa", b"bbbb", b"cccc", b"dddd"] {
            file.write_all(chunk).unwrap();
        }
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("app.log")).unwrap(), "dddd");
        assert_eq!(fs::read_to_string(tmp.path().join("app.log.1")).unwrap(), "cccc");
        assert!(!tmp.path().join("app.log.2").exists());
    }
}
