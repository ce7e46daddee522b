//! In-memory capture and download history.
//!
//! Two append-only logs, each kept newest-first. Nothing is persisted; the
//! logs live as long as the process.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::conversion::ArtifactHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Capture,
    Download,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub artifact: ArtifactHandle,
    pub timestamp: DateTime<Local>,
    pub kind: EntryKind,
}

impl HistoryEntry {
    pub fn view(&self) -> HistoryEntryView {
        HistoryEntryView {
            artifact_id: self.artifact.id(),
            file_name: self.artifact.file_name().to_string(),
            mime_type: self.artifact.mime_type().to_string(),
            size: self.artifact.len() as u64,
            timestamp: self.timestamp.to_rfc3339(),
            kind: self.kind,
        }
    }
}

/// Serializable history row, without the artifact bytes.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntryView {
    pub artifact_id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub timestamp: String,
    pub kind: EntryKind,
}

#[derive(Debug, Default)]
struct Logs {
    captures: Vec<HistoryEntry>,
    downloads: Vec<HistoryEntry>,
}

#[derive(Clone, Default)]
pub struct HistoryLog {
    inner: Arc<RwLock<Logs>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_capture(&self, artifact: ArtifactHandle, timestamp: DateTime<Local>) {
        let mut logs = self.inner.write().await;
        logs.captures.insert(
            0,
            HistoryEntry {
                artifact,
                timestamp,
                kind: EntryKind::Capture,
            },
        );
    }

    pub async fn record_download(&self, artifact: ArtifactHandle, timestamp: DateTime<Local>) {
        let mut logs = self.inner.write().await;
        logs.downloads.insert(
            0,
            HistoryEntry {
                artifact,
                timestamp,
                kind: EntryKind::Download,
            },
        );
    }

    /// Newest first.
    pub async fn captures(&self) -> Vec<HistoryEntry> {
        self.inner.read().await.captures.clone()
    }

    /// Newest first.
    pub async fn downloads(&self) -> Vec<HistoryEntry> {
        self.inner.read().await.downloads.clone()
    }

    pub async fn latest_capture(&self) -> Option<HistoryEntry> {
        self.inner.read().await.captures.first().cloned()
    }

    pub async fn find_capture(&self, id: Uuid) -> Option<HistoryEntry> {
        self.inner
            .read()
            .await
            .captures
            .iter()
            .find(|entry| entry.artifact.id() == id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::OutputFormat;
    use bytes::Bytes;

    fn artifact(data: &'static [u8]) -> ArtifactHandle {
        ArtifactHandle::new(Bytes::from_static(data), OutputFormat::WebM, Local::now())
    }

    #[tokio::test]
    async fn test_captures_newest_first() {
        let log = HistoryLog::new();
        let first = artifact(b"one");
        let second = artifact(b"two");
        log.record_capture(first.clone(), Local::now()).await;
        log.record_capture(second.clone(), Local::now()).await;

        let captures = log.captures().await;
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[0].artifact, second);
        assert_eq!(captures[1].artifact, first);
        assert_eq!(log.latest_capture().await.unwrap().artifact, second);
    }

    #[tokio::test]
    async fn test_logs_are_independent() {
        let log = HistoryLog::new();
        let a = artifact(b"a");
        log.record_capture(a.clone(), Local::now()).await;
        log.record_download(a.clone(), Local::now()).await;
        log.record_download(a.clone(), Local::now()).await;

        assert_eq!(log.captures().await.len(), 1);
        let downloads = log.downloads().await;
        assert_eq!(downloads.len(), 2);
        assert!(downloads.iter().all(|e| e.kind == EntryKind::Download));
    }

    #[tokio::test]
    async fn test_find_capture_by_id() {
        let log = HistoryLog::new();
        let a = artifact(b"a");
        log.record_capture(a.clone(), Local::now()).await;
        assert!(log.find_capture(a.id()).await.is_some());
        assert!(log.find_capture(Uuid::new_v4()).await.is_none());
    }

    #[test]
    fn test_view_omits_bytes() {
        let entry = HistoryEntry {
            artifact: artifact(b"abcd"),
            timestamp: Local::now(),
            kind: EntryKind::Capture,
        };
        let json = serde_json::to_value(entry.view()).unwrap();
        assert_eq!(json["size"], 4);
        assert_eq!(json["kind"], "capture");
        assert_eq!(json["mime_type"], "video/webm");
    }
}
