use crate::conversion::OutputFormat;
use crate::global;
use crate::i18n;
use crate::session::{Resolution, SessionConfig, SessionOptions};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recording: RecordingConfig,
    pub conversion: ConversionConfig,
    pub api: ApiConfig,
    pub ui: UiConfig,
}

/// Defaults for new sessions. `POST /start` may override per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// `WIDTHxHEIGHT`
    pub resolution: String,
    pub fps: u32,
    /// webm, mp4, gif or ogv
    pub format: String,
    pub microphone: bool,
    pub timeslice_ms: u64,
    /// How long to wait for the recorder to flush after stop.
    pub finalize_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Explicit ffmpeg binary; looked up on `$PATH` when unset.
    pub ffmpeg_path: Option<String>,
    /// Download target; defaults to the user's video directory.
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Locale used when no preference has been saved.
    pub locale: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::FULL_HD.to_string(),
            fps: 30,
            format: OutputFormat::WebM.to_string(),
            microphone: false,
            timeslice_ms: 1000,
            finalize_timeout_secs: 10,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3838 }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            locale: i18n::DEFAULT_LOCALE.to_string(),
        }
    }
}

impl RecordingConfig {
    pub fn session_config(&self) -> Result<SessionConfig> {
        let resolution: Resolution = self.resolution.parse()?;
        let format: OutputFormat = self.format.parse().map_err(|e: String| anyhow!(e))?;
        Ok(SessionConfig::new(
            resolution,
            self.fps,
            format,
            self.microphone,
        )?)
    }

    pub fn session_options(&self) -> SessionOptions {
        let defaults = SessionOptions::default();
        SessionOptions {
            timeslice: match self.timeslice_ms {
                0 => defaults.timeslice,
                ms => Duration::from_millis(ms),
            },
            finalize_timeout: match self.finalize_timeout_secs {
                0 => defaults.finalize_timeout,
                secs => Duration::from_secs(secs),
            },
        }
    }
}

impl ConversionConfig {
    pub fn ffmpeg_path(&self) -> Option<PathBuf> {
        self.ffmpeg_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        match self.output_dir.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => global::default_output_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        if !i18n::is_supported(&config.ui.locale) {
            warn!(
                "Unsupported locale '{}' in config, falling back to {}",
                config.ui.locale,
                i18n::DEFAULT_LOCALE
            );
        }

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.api.port, 3838);
        assert_eq!(config.ui.locale, "ja");

        let session = config.recording.session_config().unwrap();
        assert_eq!(session, SessionConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[recording]\nresolution = \"1280x720\"\nformat = \"mp4\"\nmicrophone = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let session = config.recording.session_config().unwrap();
        assert_eq!(session.resolution, Resolution { width: 1280, height: 720 });
        assert_eq!(session.output_format, OutputFormat::Mp4);
        assert!(session.microphone_enabled);
        assert_eq!(session.frame_rate, 30);
        assert_eq!(config.api.port, 3838);
    }

    #[test]
    fn test_invalid_recording_values_are_rejected() {
        let mut recording = RecordingConfig::default();
        recording.resolution = "wide".to_string();
        assert!(recording.session_config().is_err());

        let mut recording = RecordingConfig::default();
        recording.format = "avi".to_string();
        assert!(recording.session_config().is_err());
    }

    #[test]
    fn test_zero_timings_fall_back() {
        let recording = RecordingConfig {
            timeslice_ms: 0,
            finalize_timeout_secs: 0,
            ..RecordingConfig::default()
        };
        let options = recording.session_options();
        assert_eq!(options.timeslice, Duration::from_millis(1000));
        assert_eq!(options.finalize_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_blank_ffmpeg_path_is_none() {
        let conversion = ConversionConfig {
            ffmpeg_path: Some("  ".to_string()),
            output_dir: Some("/tmp/out".to_string()),
        };
        assert!(conversion.ffmpeg_path().is_none());
        assert_eq!(conversion.output_dir().unwrap(), PathBuf::from("/tmp/out"));
    }
}
