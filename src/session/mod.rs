//! Recording session: configuration, status, errors and the state machine.

pub mod config;
pub mod error;
pub mod machine;
pub mod status;

pub use config::{Resolution, SessionConfig};
pub use error::SessionError;
pub use machine::{RecordingSession, SessionOptions};
pub use status::{SessionSnapshot, SessionStatusHandle, Status, StatusMessage, StatusUpdate};
