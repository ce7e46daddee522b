//! Output formats and their fixed transcode recipes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the native recording inside the transcoder's file system.
pub const INPUT_NAME: &str = "input.webm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The recorder's own container; no transcoding.
    WebM,
    Mp4,
    Gif,
    Ogv,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::WebM,
        OutputFormat::Mp4,
        OutputFormat::Gif,
        OutputFormat::Ogv,
    ];

    pub fn is_native(&self) -> bool {
        matches!(self, OutputFormat::WebM)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::WebM => "webm",
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Gif => "gif",
            OutputFormat::Ogv => "ogv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::WebM => "video/webm",
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Ogv => "video/ogg",
        }
    }

    /// File the transcoder writes for this format.
    pub fn output_name(&self) -> String {
        format!("out.{}", self.extension())
    }

    /// Transcoder arguments, `None` for the native container.
    pub fn recipe(&self) -> Option<Vec<String>> {
        let args: &[&str] = match self {
            OutputFormat::WebM => return None,
            // Efficient single-track H.264/AAC re-encode
            OutputFormat::Mp4 => &[
                "-i", INPUT_NAME, "-c:v", "libx264", "-preset", "veryfast", "-crf", "28", "-c:a",
                "aac", "-b:a", "128k", "out.mp4",
            ],
            // Size-capped, resampled, low frame rate silent loop
            OutputFormat::Gif => &[
                "-i",
                INPUT_NAME,
                "-vf",
                "fps=12,scale=480:-1:flags=lanczos",
                "-t",
                "10",
                "out.gif",
            ],
            OutputFormat::Ogv => &[
                "-i", INPUT_NAME, "-c:v", "libtheora", "-q:v", "7", "-c:a", "libvorbis", "-q:a",
                "4", "out.ogv",
            ],
        };
        Some(args.iter().map(|s| s.to_string()).collect())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webm" | "native" => Ok(OutputFormat::WebM),
            "mp4" => Ok(OutputFormat::Mp4),
            "gif" => Ok(OutputFormat::Gif),
            "ogv" | "ogg" => Ok(OutputFormat::Ogv),
            other => Err(format!(
                "Unsupported format '{other}' (expected webm, mp4, gif or ogv)"
            )),
        }
    }
}
