//! Immutable per-session input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SessionError;
use crate::conversion::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = SessionError;

    /// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SessionError::InvalidConfig(format!("invalid resolution '{s}'"));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub output_format: OutputFormat,
    pub microphone_enabled: bool,
}

impl SessionConfig {
    pub fn new(
        resolution: Resolution,
        frame_rate: u32,
        output_format: OutputFormat,
        microphone_enabled: bool,
    ) -> Result<Self, SessionError> {
        if frame_rate == 0 {
            return Err(SessionError::InvalidConfig(
                "frame rate must be positive".to_string(),
            ));
        }
        if resolution.width == 0 || resolution.height == 0 {
            return Err(SessionError::InvalidConfig(format!(
                "invalid resolution '{resolution}'"
            )));
        }
        Ok(Self {
            resolution,
            frame_rate,
            output_format,
            microphone_enabled,
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::FULL_HD,
            frame_rate: 30,
            output_format: OutputFormat::WebM,
            microphone_enabled: false,
        }
    }
}
