use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use log::{Level, LevelFilter, Metadata, Record};

/// Formatted log lines waiting to be shown in the on-screen log panel.
///
/// Cloning yields another handle to the same queue, so the logger and the shell share it.
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lock().push_back(line.into());
    }

    pub fn drain(&self) -> Vec<String> {
        self.lock().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub fn format_record(record: &Record) -> String {
    format_line(record.level(), record.args())
}

/// `HH:MM:SS - LEVEL - message`, the layout of every line in the log panel.
pub fn format_line(level: Level, message: impl std::fmt::Display) -> String {
    format!(
        "{} - {} - {}",
        chrono::Local::now().format("%H:%M:%S"),
        level,
        message
    )
}

struct PanelLogger {
    sink: LogSink,
    file: Option<Mutex<File>>,
    level: LevelFilter,
}

impl log::Log for PanelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|p| p.into_inner());
            let _ = writeln!(file, "{line}");
        }
        self.sink.push(line);
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().unwrap_or_else(|p| p.into_inner()).flush();
        }
    }
}

/// Route `log` records from this crate into `sink`, and into `file` when given.
pub fn install(sink: LogSink, file: Option<&Path>, level: LevelFilter) -> Result<()> {
    let file = match file {
        Some(path) => Some(Mutex::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?,
        )),
        None => None,
    };
    log::set_boxed_logger(Box::new(PanelLogger { sink, file, level }))
        .context("a logger is already installed")?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_shared_between_clones() {
        let sink = LogSink::new();
        let other = sink.clone();
        other.push("12:00:00 - INFO - hello");
        assert!(!sink.is_empty());
        assert_eq!(sink.drain(), vec!["12:00:00 - INFO - hello".to_string()]);
        assert!(other.is_empty());
    }

    #[test]
    fn test_format_record_layout() {
        let line = format_record(
            &Record::builder()
                .args(format_args!("Playing ep {}", 3))
                .level(log::Level::Warn)
                .target("crunsuck::app")
                .build(),
        );
        let parts: Vec<&str> = line.splitn(3, " - ").collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1], "WARN");
        assert_eq!(parts[2], "Playing ep 3");
    }
}
