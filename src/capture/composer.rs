//! Source negotiation and stream composition.
//!
//! Strategy:
//! 1. Request the display (with system audio when the platform offers it)
//! 2. Request the microphone if enabled; a refusal degrades to no mic audio
//! 3. Compose display video + every available audio track into one stream
//! 4. Watch the display video track so an external revoke reaches the session

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::media::{
    AudioConstraints, CaptureDevice, CaptureError, CaptureProvider, DisplayConstraints,
    EventSink, MediaStream, SessionEvent, TrackRef,
};
use crate::session::SessionConfig;

/// The live sources of one session. Dropping it does not stop anything;
/// call `release`.
pub struct CaptureSources {
    pub display_video: TrackRef,
    pub display_audio: Option<TrackRef>,
    pub microphone_audio: Option<TrackRef>,
    /// Every track returned by the providers, including ones left out of the
    /// composed stream (extra display video tracks, extra mic channels).
    acquired: Vec<TrackRef>,
    watcher: Option<JoinHandle<()>>,
}

impl CaptureSources {
    /// Stop every acquired track and the termination observer.
    /// Returns the number of tracks that were still live.
    pub fn release(&mut self) -> usize {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        let mut stopped = 0;
        for track in self.acquired.drain(..) {
            if track.is_live() {
                stopped += 1;
            }
            track.stop();
        }
        debug!("Released capture sources ({} live tracks stopped)", stopped);
        stopped
    }

    pub fn has_audio(&self) -> bool {
        self.display_audio.is_some() || self.microphone_audio.is_some()
    }
}

impl Drop for CaptureSources {
    fn drop(&mut self) {
        if !self.acquired.is_empty() {
            debug!("Dropping unreleased CaptureSources, cleaning up");
            self.release();
        }
    }
}

/// Result of a successful acquisition.
pub struct Composition {
    pub sources: CaptureSources,
    pub stream: MediaStream,
    /// Set when the microphone was requested but refused.
    pub microphone_denied: Option<CaptureError>,
}

pub struct StreamComposer {
    provider: Arc<dyn CaptureProvider>,
}

impl StreamComposer {
    pub fn new(provider: Arc<dyn CaptureProvider>) -> Self {
        Self { provider }
    }

    pub async fn acquire(
        &self,
        config: &SessionConfig,
        events: EventSink,
    ) -> Result<Composition, CaptureError> {
        let constraints = DisplayConstraints {
            width: config.resolution.width,
            height: config.resolution.height,
            frame_rate: config.frame_rate,
            audio: true,
        };

        let display = self.provider.request_display_capture(&constraints).await?;
        let Some(display_video) = display.first_video() else {
            display.stop_all();
            return Err(CaptureError::denied(
                CaptureDevice::Display,
                "display capture returned no video track",
            ));
        };
        let display_audio = display.first_audio();
        let mut acquired: Vec<TrackRef> = display.tracks().to_vec();

        let mut microphone_audio = None;
        let mut microphone_denied = None;
        if config.microphone_enabled {
            match self
                .provider
                .request_microphone_capture(&AudioConstraints::default())
                .await
            {
                Ok(mic) => {
                    microphone_audio = mic.first_audio();
                    acquired.extend(mic.tracks().iter().cloned());
                    if microphone_audio.is_none() {
                        warn!("Microphone stream has no audio track, continuing without mic");
                    }
                }
                Err(e) => {
                    warn!("Microphone access failed, continuing without mic audio: {}", e);
                    microphone_denied = Some(e);
                }
            }
        }

        let mut tracks = vec![display_video.clone()];
        tracks.extend(display_audio.iter().cloned());
        tracks.extend(microphone_audio.iter().cloned());
        let stream = MediaStream::new(tracks);

        let watcher = Self::watch_display(display_video.clone(), events);

        info!(
            "Composed capture stream: video={}, display_audio={}, mic_audio={}",
            display_video.label(),
            display_audio.is_some(),
            microphone_audio.is_some()
        );

        Ok(Composition {
            sources: CaptureSources {
                display_video,
                display_audio,
                microphone_audio,
                acquired,
                watcher: Some(watcher),
            },
            stream,
            microphone_denied,
        })
    }

    fn watch_display(track: TrackRef, events: EventSink) -> JoinHandle<()> {
        tokio::spawn(async move {
            track.ended().await;
            info!("Display track '{}' ended, signalling revoke", track.label());
            events.send(SessionEvent::SourcesRevoked);
        })
    }
}
