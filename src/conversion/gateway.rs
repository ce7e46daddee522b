//! Turns captured chunks into the requested artifact.
//!
//! One transcode provider per gateway, loaded on first use and reused.
//! The provider is not reentrant, so conversions run one at a time.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Local;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::artifact::ArtifactHandle;
use super::format::{OutputFormat, INPUT_NAME};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscodeError {
    #[error("transcoder unavailable: {0}")]
    Unavailable(String),
    #[error("transcoder I/O failed: {0}")]
    Io(String),
    #[error("transcode run failed: {0}")]
    Run(String),
}

/// External transcoding capability with a small virtual file system.
#[async_trait]
pub trait TranscodeProvider: Send {
    fn is_loaded(&self) -> bool;
    async fn load(&mut self) -> Result<(), TranscodeError>;
    async fn write_input(&mut self, name: &str, bytes: &[u8]) -> Result<(), TranscodeError>;
    async fn run(&mut self, args: &[String]) -> Result<(), TranscodeError>;
    async fn read_output(&mut self, name: &str) -> Result<Vec<u8>, TranscodeError>;
}

/// Conversion failed; the native recording is still usable.
#[derive(Error, Debug, Clone)]
#[error("conversion to {format} failed: {reason}")]
pub struct ConversionFailed {
    pub format: OutputFormat,
    pub reason: String,
    pub fallback: ArtifactHandle,
}

#[derive(Clone)]
pub struct ConversionGateway {
    provider: Arc<Mutex<Box<dyn TranscodeProvider>>>,
}

impl ConversionGateway {
    pub fn new(provider: Box<dyn TranscodeProvider>) -> Self {
        Self {
            provider: Arc::new(Mutex::new(provider)),
        }
    }

    pub async fn finalize(
        &self,
        chunks: &[Bytes],
        format: OutputFormat,
    ) -> Result<ArtifactHandle, ConversionFailed> {
        let native = assemble(chunks);
        let created = Local::now();
        let native_artifact = || ArtifactHandle::new(native.clone(), OutputFormat::WebM, created);

        let Some(args) = format.recipe() else {
            debug!("Native output requested, {} bytes", native.len());
            return Ok(native_artifact());
        };

        info!("Converting {} bytes of webm to {}", native.len(), format);
        match self.transcode(&native, &args, &format.output_name()).await {
            Ok(output) => {
                info!("Conversion to {} complete: {} bytes", format, output.len());
                Ok(ArtifactHandle::new(Bytes::from(output), format, created))
            }
            Err(e) => {
                warn!("Conversion to {} failed, keeping webm: {}", format, e);
                Err(ConversionFailed {
                    format,
                    reason: e.to_string(),
                    fallback: native_artifact(),
                })
            }
        }
    }

    async fn transcode(
        &self,
        input: &[u8],
        args: &[String],
        output_name: &str,
    ) -> Result<Vec<u8>, TranscodeError> {
        let mut provider = self.provider.lock().await;
        if !provider.is_loaded() {
            info!("Loading transcoder");
            provider.load().await?;
        }
        provider.write_input(INPUT_NAME, input).await?;
        provider.run(args).await?;
        provider.read_output(output_name).await
    }
}

/// Concatenate chunks in delivery order.
pub fn assemble(chunks: &[Bytes]) -> Bytes {
    if let [single] = chunks {
        return single.clone();
    }
    let total = chunks.iter().map(Bytes::len).sum();
    let mut buf = BytesMut::with_capacity(total);
    for chunk in chunks {
        buf.extend_from_slice(chunk);
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_concatenates_in_order() {
        let chunks = vec![
            Bytes::from_static(b"ab"),
            Bytes::from_static(b""),
            Bytes::from_static(b"cde"),
        ];
        assert_eq!(assemble(&chunks), Bytes::from_static(b"abcde"));
    }

    #[test]
    fn test_assemble_empty() {
        assert!(assemble(&[]).is_empty());
    }
}
