//! Progress modal host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;
use tracing::info;

/// Visual style of the progress modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalKind {
    Loading,
    Error,
    Success,
}

/// Receives progress updates. Return values are never inspected.
pub trait ProgressHost: Send + Sync {
    fn show_modal(&self, message: &str, kind: ModalKind, percent: u8);
    fn hide_modal(&self);
}

/// One modal update, as written by [`JsonlProgressHost`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalUpdate {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModalKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
}

impl ModalUpdate {
    pub fn show(message: &str, kind: ModalKind, percent: u8) -> Self {
        Self {
            event: "modal_shown".to_string(),
            timestamp: Utc::now(),
            kind: Some(kind),
            message: Some(message.to_string()),
            percent: Some(percent),
        }
    }

    pub fn hide() -> Self {
        Self {
            event: "modal_hidden".to_string(),
            timestamp: Utc::now(),
            kind: None,
            message: None,
            percent: None,
        }
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// JSONL writer for modal updates (CLI-friendly).
pub struct JsonlProgressHost<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlProgressHost<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self, update: ModalUpdate) {
        let line = update.to_jsonl();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

impl<W: Write + Send> ProgressHost for JsonlProgressHost<W> {
    fn show_modal(&self, message: &str, kind: ModalKind, percent: u8) {
        self.write(ModalUpdate::show(message, kind, percent));
    }

    fn hide_modal(&self) {
        self.write(ModalUpdate::hide());
    }
}

/// Forwards modal updates to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressHost;

impl ProgressHost for TracingProgressHost {
    fn show_modal(&self, message: &str, kind: ModalKind, percent: u8) {
        info!(target: "dr_report::progress", ?kind, percent, "{}", message);
    }

    fn hide_modal(&self) {
        info!(target: "dr_report::progress", "modal hidden");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_update_jsonl() {
        let json = ModalUpdate::show("Generating PDF...", ModalKind::Loading, 90).to_jsonl();
        assert!(json.contains(r#""event":"modal_shown""#));
        assert!(json.contains(r#""kind":"loading""#));
        assert!(json.contains(r#""percent":90"#));

        let hidden = ModalUpdate::hide().to_jsonl();
        assert!(!hidden.contains("percent"));
    }

    #[test]
    fn test_jsonl_host_writes_lines() {
        let host = JsonlProgressHost::new(Vec::new());
        host.show_modal("Preparing report...", ModalKind::Loading, 0);
        host.show_modal("oops", ModalKind::Error, 12);
        host.hide_modal();
        let output = String::from_utf8(host.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: ModalUpdate = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.kind, Some(ModalKind::Error));
        assert_eq!(parsed.message.as_deref(), Some("oops"));
    }
}
