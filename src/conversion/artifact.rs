//! Finalized recording output and the handle used to reference it.

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::format::OutputFormat;

#[derive(Debug)]
pub struct Artifact {
    id: Uuid,
    bytes: Bytes,
    format: OutputFormat,
    mime_type: String,
    file_name: String,
}

/// Cheap, cloneable reference to produced bytes.
#[derive(Clone)]
pub struct ArtifactHandle(Arc<Artifact>);

impl ArtifactHandle {
    pub fn new(bytes: Bytes, format: OutputFormat, created: DateTime<Local>) -> Self {
        Self(Arc::new(Artifact {
            id: Uuid::new_v4(),
            bytes,
            format,
            mime_type: format.mime_type().to_string(),
            file_name: file_name_for(format, created),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.0.bytes
    }

    pub fn len(&self) -> usize {
        self.0.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.bytes.is_empty()
    }

    pub fn format(&self) -> OutputFormat {
        self.0.format
    }

    pub fn mime_type(&self) -> &str {
        &self.0.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.0.file_name
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id(),
            file_name: self.file_name().to_string(),
            mime_type: self.mime_type().to_string(),
            format: self.format(),
            size: self.len() as u64,
        }
    }

    /// Write the artifact into `dir` under its file name.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {dir:?}"))?;
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.bytes())
            .await
            .with_context(|| format!("Failed to write artifact to {path:?}"))?;
        Ok(path)
    }
}

impl PartialEq for ArtifactHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("id", &self.0.id)
            .field("format", &self.0.format)
            .field("size", &self.0.bytes.len())
            .finish()
    }
}

/// Serializable view of an artifact, without the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub format: OutputFormat,
    pub size: u64,
}

/// `capture_2024-05-01T09-30-00.webm`
pub fn file_name_for(format: OutputFormat, created: DateTime<Local>) -> String {
    format!(
        "capture_{}.{}",
        created.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}
