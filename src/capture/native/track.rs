use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::capture::media::{MediaTrack, TrackKind};

/// A track backed by an ffmpeg input device.
///
/// The track itself holds no OS resources; it carries the input arguments the
/// recorder needs and an ended flag that both local stops and the recorder's
/// process supervisor can set.
pub struct NativeTrack {
    id: String,
    kind: TrackKind,
    label: String,
    input_args: Vec<String>,
    ended: watch::Sender<bool>,
}

impl NativeTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>, input_args: Vec<String>) -> Arc<Self> {
        let (ended, _) = watch::channel(false);
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            input_args,
            ended,
        })
    }

    /// ffmpeg arguments that open this source, ending with `-i <target>`.
    pub fn input_args(&self) -> &[String] {
        &self.input_args
    }

    /// Mark the source as gone without a local stop request.
    pub fn end(&self) {
        if !self.ended.send_replace(true) {
            debug!("Track {} ({}) ended", self.id, self.label);
        }
    }
}

#[async_trait]
impl MediaTrack for NativeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&self) {
        self.end();
    }

    fn is_live(&self) -> bool {
        !*self.ended.borrow()
    }

    async fn ended(&self) {
        let mut rx = self.ended.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}
