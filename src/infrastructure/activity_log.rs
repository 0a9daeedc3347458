use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

const LOG_FILE: &str = "client.log";

#[derive(Debug)]
enum LogSink {
    File(PathBuf),
    Memory(Mutex<Vec<serde_json::Value>>),
}

/// Append-only JSON-lines log of client activity. Logging never fails the
/// caller: write errors are dropped.
#[derive(Debug)]
pub struct ActivityLog {
    sink: LogSink,
    guard: Mutex<()>,
}

impl ActivityLog {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            sink: LogSink::File(logs_dir.into().join(LOG_FILE)),
            guard: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            sink: LogSink::Memory(Mutex::new(Vec::new())),
            guard: Mutex::new(()),
        }
    }

    pub fn log_info(&self, event: &str, message: &str) {
        self.append("info", event, message);
    }

    pub fn log_error(&self, event: &str, message: &str) {
        self.append("error", event, message);
    }

    /// Entries recorded by an in-memory log; always empty for file logs.
    pub fn entries(&self) -> Vec<serde_json::Value> {
        match &self.sink {
            LogSink::Memory(entries) => entries
                .lock()
                .map(|entries| entries.clone())
                .unwrap_or_default(),
            LogSink::File(_) => Vec::new(),
        }
    }

    fn append(&self, level: &str, event: &str, message: &str) {
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "event": event,
            "message": message,
        });

        match &self.sink {
            LogSink::File(path) => {
                if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                    let _ = writeln!(file, "{}", payload);
                }
            }
            LogSink::Memory(entries) => {
                if let Ok(mut entries) = entries.lock() {
                    entries.push(payload);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn file_log_appends_one_json_object_per_line() {
        let dir = std::env::temp_dir().join(format!("pomodoro-log-tests-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create log dir");
        let log = ActivityLog::new(&dir);

        log.log_info("poll", "applied seq=1");
        log.log_error("start_focus", "network error");

        let raw = fs::read_to_string(dir.join(LOG_FILE)).expect("read log");
        let lines = raw.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("valid json line");
        assert_eq!(second["level"], "error");
        assert_eq!(second["event"], "start_focus");
        assert!(second["timestamp"].as_str().is_some());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_log_records_entries() {
        let log = ActivityLog::in_memory();
        log.log_info("preset", "selected long");
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["message"], "selected long");
    }
}
