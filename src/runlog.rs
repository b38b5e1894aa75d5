// Plain text logs of lookup outcomes, one file per outcome, so a run can be reviewed afterwards
// without digging through the tracing output.

use chrono::Local;
use std::{
    fmt::Display,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Error,
}

impl Outcome {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Success => "success_log.txt",
            Self::Failure => "failure_log.txt",
            Self::Error => "error_log.txt",
        }
    }
}

#[derive(Debug, Default)]
pub struct RunLog {
    dir: Option<PathBuf>,
    // serializes appends from concurrent lookups
    lock: Mutex<()>,
}

impl RunLog {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
            lock: Mutex::new(()),
        }
    }

    /// A run log that only emits tracing events
    pub fn disabled() -> Self {
        Default::default()
    }

    pub fn success(&self, msg: impl Display) {
        self.record(Outcome::Success, msg)
    }

    pub fn failure(&self, msg: impl Display) {
        self.record(Outcome::Failure, msg)
    }

    pub fn error(&self, msg: impl Display) {
        self.record(Outcome::Error, msg)
    }

    pub fn record(&self, outcome: Outcome, msg: impl Display) {
        match outcome {
            Outcome::Success => info!("{msg}"),
            Outcome::Failure => warn!("{msg}"),
            Outcome::Error => error!("{msg}"),
        }

        let Some(dir) = self.dir.as_ref() else {
            return;
        };
        let line = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
        let path = dir.join(outcome.file_name());

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(err) = res {
            warn!(%err, path = %path.display(), "Failed to write run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn entries_go_to_their_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path());
        log.success("found it");
        log.error("broke");
        log.error("broke again");

        let success = fs::read_to_string(dir.path().join("success_log.txt")).unwrap();
        let errors = fs::read_to_string(dir.path().join("error_log.txt")).unwrap();
        assert!(!dir.path().join("failure_log.txt").exists());

        assert_eq!(1, success.lines().count());
        assert!(success.starts_with('['));
        assert!(success.trim_end().ends_with("] found it"));
        assert_eq!(2, errors.lines().count());
        assert!(errors.lines().all(|l| l.contains("broke")));
    }

    #[test]
    fn timestamp_prefix() {
        let dir = tempfile::tempdir().unwrap();
        RunLog::new(dir.path()).failure("nope");
        let line = fs::read_to_string(dir.path().join("failure_log.txt")).unwrap();
        // [YYYY-MM-DD HH:MM:SS] nope
        assert_eq!(b'[', line.as_bytes()[0]);
        assert_eq!(b']', line.as_bytes()[20]);
        assert_eq!(" nope\n", &line[21..]);
    }

    #[test]
    fn disabled_writes_nothing() {
        let log = RunLog::disabled();
        log.success("nowhere");
    }
}
