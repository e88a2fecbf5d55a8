use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_status;

pub enum MessageLogMode {
    Full,
    Diffed,
}

/// NDJSON log of wire traffic: frames sent, commands issued, polls decoded.
/// `Diffed` mode records only field-level changes between poll bodies.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_body: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_body: None,
        })
    }

    pub fn log_command(&mut self, action: &str, delta: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "delta": delta,
        });
        self.write_line(&entry);
    }

    pub fn log_send(&mut self, frame: &[u8]) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "send",
            "frame": String::from_utf8_lossy(frame),
        });
        self.write_line(&entry);
    }

    /// Record a poll result; `None` means the receive produced no valid frame.
    pub fn log_poll(&mut self, body: Option<&Value>) {
        let Some(body) = body else {
            let entry = json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "poll",
                "empty": true,
            });
            self.write_line(&entry);
            return;
        };

        match self.mode {
            MessageLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "poll",
                    "body": body,
                });
                self.write_line(&entry);
            }
            MessageLogMode::Diffed => {
                match &self.previous_body {
                    None => {
                        let entry = json!({
                            "ts": Utc::now().to_rfc3339(),
                            "dir": "poll",
                            "full": true,
                            "body": body,
                        });
                        self.write_line(&entry);
                    }
                    Some(prev) => {
                        let change_entries: Vec<Value> = diff_status(prev, body)
                            .iter()
                            .map(|(path, old, new)| {
                                json!({ "path": path, "old": old, "new": new })
                            })
                            .collect();
                        let entry = json!({
                            "ts": Utc::now().to_rfc3339(),
                            "dir": "poll",
                            "changes": change_entries,
                        });
                        self.write_line(&entry);
                    }
                }
                self.previous_body = Some(body.clone());
            }
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
