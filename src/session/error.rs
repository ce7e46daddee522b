//! Session error kinds.

use thiserror::Error;

use crate::capture::{CaptureDevice, CaptureError};
use crate::conversion::{ConversionFailed, OutputFormat};
use crate::i18n::keys;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Display or microphone acquisition was declined. Only the display
    /// variant aborts a start; a microphone refusal is reported and skipped.
    #[error("{device} permission denied: {reason}")]
    PermissionDenied {
        device: CaptureDevice,
        reason: String,
    },

    /// An active source terminated outside of this program's control.
    #[error("capture device lost")]
    DeviceLost,

    #[error("recorder error: {0}")]
    RecorderError(String),

    /// The native recording stays available as a fallback.
    #[error("conversion to {format} failed: {reason}")]
    ConversionFailed {
        format: OutputFormat,
        reason: String,
    },

    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Localization key of the status prefix shown for this error.
    pub fn status_key(&self) -> &'static str {
        match self {
            SessionError::PermissionDenied { .. } | SessionError::InvalidConfig(_) => {
                keys::CANCELLED
            }
            SessionError::DeviceLost => keys::STOPPING,
            SessionError::RecorderError(_) => keys::ERROR_PREFIX,
            SessionError::ConversionFailed { .. } => keys::CONVERSION_FAILED,
        }
    }
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied { device, reason } => {
                SessionError::PermissionDenied { device, reason }
            }
            CaptureError::Recorder(reason) => SessionError::RecorderError(reason),
            CaptureError::Unsupported(what) => SessionError::PermissionDenied {
                device: CaptureDevice::Display,
                reason: format!("unsupported: {what}"),
            },
        }
    }
}

impl From<&ConversionFailed> for SessionError {
    fn from(err: &ConversionFailed) -> Self {
        SessionError::ConversionFailed {
            format: err.format,
            reason: err.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_denial_maps_to_permission_denied() {
        let err: SessionError = CaptureError::denied(CaptureDevice::Display, "NotAllowed").into();
        assert_eq!(
            err,
            SessionError::PermissionDenied {
                device: CaptureDevice::Display,
                reason: "NotAllowed".to_string()
            }
        );
        assert_eq!(err.status_key(), "status_cancelled");
    }

    #[test]
    fn test_recorder_failure_maps_to_recorder_error() {
        let err: SessionError = CaptureError::Recorder("encoder crashed".into()).into();
        assert_eq!(err.to_string(), "recorder error: encoder crashed");
    }

    #[test]
    fn test_every_status_key_is_translated() {
        let localizer = crate::i18n::Localizer::default();
        let errors = [
            SessionError::PermissionDenied {
                device: CaptureDevice::Microphone,
                reason: "NotAllowed".to_string(),
            },
            SessionError::DeviceLost,
            SessionError::RecorderError("boom".to_string()),
            SessionError::ConversionFailed {
                format: OutputFormat::Gif,
                reason: "boom".to_string(),
            },
            SessionError::InvalidConfig("fps".to_string()),
        ];
        for err in &errors {
            for locale in crate::i18n::SUPPORTED_LOCALES {
                let key = err.status_key();
                assert_ne!(localizer.lookup(key, locale), key, "{key} in {locale}");
            }
        }
    }
}
