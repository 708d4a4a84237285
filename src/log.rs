use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use time::{macros::format_description, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug)]
pub struct MigrationLog {
    path: PathBuf,
}

impl MigrationLog {
    pub fn to_file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Write failures are dropped.
    fn push(&mut self, level: LogLevel, message: String) {
        let _ = append_log_file(&self.path, level, &message);
    }
}

pub fn run_log_name() -> String {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "unknown".to_string());
    format!("migration-{stamp}.log")
}

fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn line_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_default()
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> io::Result<()> {
    let label = log_level_label(level);
    let stamp = line_timestamp();
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "[{stamp}] [{label}] {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_log_lines_are_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let mut log = MigrationLog::to_file(&path).unwrap();
        log.info("Stage Metadata started");
        log.warn("archive missing for abc");

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("[INFO] Stage Metadata started"));
        assert!(lines[1].ends_with("[WARN] archive missing for abc"));
        assert_eq!(log.path(), path.as_path());
    }

    #[test]
    fn reopening_a_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        MigrationLog::to_file(&path).unwrap().info("first run");
        let mut log = MigrationLog::to_file(&path).unwrap();
        log.error("second run");

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("[ERROR] second run"));
    }

    #[test]
    fn run_log_name_has_extension() {
        let name = run_log_name();
        assert!(name.starts_with("migration-"));
        assert!(name.ends_with(".log"));
    }
}
