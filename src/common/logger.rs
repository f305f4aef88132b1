use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    sync::Arc,
};

use parking_lot::Mutex;
use tracing_subscriber::{EnvFilter, fmt::{self, time::LocalTime}, prelude::*};

use crate::{
    common::types::AnyResult,
    configs::{Config, LoggingConfig},
};

/// Builds the `EnvFilter` directive string from the logging section.
pub fn filter_directives(logging: Option<&LoggingConfig>) -> String {
    let level = logging
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");
    let filters = logging
        .and_then(|l| l.filters.as_deref())
        .map(str::trim)
        .unwrap_or("");

    if filters.is_empty() {
        level.to_string()
    } else {
        format!("{},{}", level, filters)
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the config file.
///
/// Called once by the binary embedding the crate, after [`Config::load`].
/// Fails if a global subscriber is already set.
pub fn init(config: &Config) -> AnyResult<()> {
    let logging = config.logging.as_ref();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(logging)));

    let stdout_layer = fmt::layer()
        .with_timer(LocalTime::rfc_3339())
        .with_target(true)
        .with_line_number(true)
        .with_file(false);

    let file_layer = logging.and_then(|l| l.file.as_ref()).map(|file| {
        if let Some(parent) = file.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory: {}", e);
            }
        }

        fmt::layer()
            .with_writer(LineCappedFile::new(file.path.clone(), file.max_lines))
            .with_timer(LocalTime::rfc_3339())
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

/// Append-only log file that drops its oldest lines once it grows past
/// `max_lines`. Pruning runs every `max_lines / 10` (at least 50) new lines.
#[derive(Clone)]
pub(crate) struct LineCappedFile {
    path: PathBuf,
    max_lines: usize,
    written_since_prune: Arc<Mutex<usize>>,
}

impl LineCappedFile {
    pub(crate) fn new(path: PathBuf, max_lines: usize) -> Self {
        Self {
            path,
            max_lines: max_lines.max(1),
            written_since_prune: Arc::new(Mutex::new(0)),
        }
    }

    fn prune_interval(&self) -> usize {
        (self.max_lines / 10).max(50)
    }

    pub(crate) fn prune(&self) -> io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let lines = BufReader::new(File::open(&self.path)?)
            .lines()
            .collect::<Result<Vec<_>, _>>()?;
        if lines.len() <= self.max_lines {
            return Ok(());
        }

        let mut file = File::create(&self.path)?;
        for line in &lines[lines.len() - self.max_lines..] {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

impl io::Write for LineCappedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        let mut written = self.written_since_prune.lock();
        *written += buf.iter().filter(|&&b| b == b'\n').count();
        if *written >= self.prune_interval() {
            if let Err(e) = self.prune() {
                eprintln!("Failed to prune log file {}: {}", self.path.display(), e);
            }
            *written = 0;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> fmt::MakeWriter<'a> for LineCappedFile {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
