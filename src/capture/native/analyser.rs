//! Live audio level analysis over a cpal input stream.
//!
//! `cpal::Stream` is not `Send` on every host, so the stream is built and
//! owned by a dedicated thread that parks until the analyser is closed.

use cpal::traits::{DeviceTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, error, warn};

use super::devices::input_device_named;
use crate::capture::media::{AudioAnalyser, CaptureError};
use crate::capture::waveform::samples_to_bytes;

/// Number of time-domain samples kept for the waveform.
pub const WINDOW_SIZE: usize = 512;

pub struct CpalAnalyser {
    window: Arc<Mutex<Vec<f32>>>,
    shutdown: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalAnalyser {
    /// Open the input device named `device_name` (or the default input).
    pub fn open(device_name: &str) -> Result<Self, CaptureError> {
        let window = Arc::new(Mutex::new(Vec::with_capacity(WINDOW_SIZE)));
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), String>>();

        let name = device_name.to_string();
        let samples = window.clone();
        let thread = std::thread::Builder::new()
            .name("aro-analyser".to_string())
            .spawn(move || {
                let stream = match build_stream(&name, samples) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Blocks until close() sends or drops the sender.
                let _ = shutdown_rx.recv();
                debug!("Stopping analyser stream for {}", name);
                drop(stream);
            })
            .map_err(|e| CaptureError::Unsupported(format!("analyser thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                window,
                shutdown: Some(shutdown_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(CaptureError::Unsupported(e))
            }
            Err(_) => Err(CaptureError::Unsupported(
                "analyser thread exited early".to_string(),
            )),
        }
    }
}

fn build_stream(device_name: &str, window: Arc<Mutex<Vec<f32>>>) -> Result<cpal::Stream, String> {
    let device = input_device_named(device_name)
        .ok_or_else(|| format!("input device '{device_name}' not found"))?;
    let default_config = device
        .default_input_config()
        .map_err(|e| format!("no input config: {e}"))?;
    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| error!("Analyser stream error: {}", err);
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut window) = window.lock() {
                    push_window(&mut window, data);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| format!("failed to build analyser stream: {e}"))?;
    stream
        .play()
        .map_err(|e| format!("failed to start analyser stream: {e}"))?;
    Ok(stream)
}

/// Keep only the newest `WINDOW_SIZE` samples.
fn push_window(window: &mut Vec<f32>, data: &[f32]) {
    window.extend_from_slice(data);
    if window.len() > WINDOW_SIZE {
        let excess = window.len() - WINDOW_SIZE;
        window.drain(..excess);
    }
}

impl AudioAnalyser for CpalAnalyser {
    fn time_domain_data(&self) -> Vec<u8> {
        match self.window.lock() {
            Ok(window) => samples_to_bytes(&window),
            Err(_) => Vec::new(),
        }
    }

    fn close(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Analyser thread panicked");
            }
        }
    }
}

impl Drop for CpalAnalyser {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            debug!("Dropping open CpalAnalyser, cleaning up");
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_newest_samples() {
        let mut window = Vec::new();
        push_window(&mut window, &vec![0.0; WINDOW_SIZE - 1]);
        push_window(&mut window, &[0.5, 1.0]);
        assert_eq!(window.len(), WINDOW_SIZE);
        assert_eq!(window[WINDOW_SIZE - 1], 1.0);
        assert_eq!(window[WINDOW_SIZE - 2], 0.5);
    }
}
