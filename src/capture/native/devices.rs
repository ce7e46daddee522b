//! Audio device discovery via cpal.
//!
//! System audio comes from a PipeWire/PulseAudio monitor source, which exposes
//! the output mix as an input device. The microphone is the default input.

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::{debug, info};

/// An input device, named the way cpal lists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
}

pub fn is_monitor_name(name: &str) -> bool {
    name.to_lowercase().contains("monitor")
}

/// First monitor source that reports a usable input config.
pub fn find_monitor_device() -> Option<AudioDevice> {
    let host = cpal::default_host();

    for device in host.input_devices().ok()? {
        let Ok(name) = device.name() else { continue };
        if !is_monitor_name(&name) {
            continue;
        }
        if let Ok(config) = device.default_input_config() {
            info!(
                "Found system audio monitor: {} ({}Hz)",
                name,
                config.sample_rate().0
            );
            return Some(AudioDevice { name });
        }
    }

    debug!("No monitor input device found");
    None
}

/// The default input device, if one exists and can be opened.
pub fn default_microphone() -> Result<AudioDevice, String> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| "no input device available".to_string())?;
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let config = device
        .default_input_config()
        .map_err(|e| format!("input device '{name}' unusable: {e}"))?;

    info!("Microphone device: {} ({}Hz)", name, config.sample_rate().0);
    Ok(AudioDevice { name })
}

/// Look up an input device by name, falling back to the default input.
pub fn input_device_named(name: &str) -> Option<cpal::Device> {
    let host = cpal::default_host();
    let named = host.input_devices().ok().and_then(|mut devices| {
        devices.find(|d| d.name().map(|n| n == name).unwrap_or(false))
    });
    named.or_else(|| host.default_input_device())
}
