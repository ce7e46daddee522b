//! Offline conversion of an existing WebM recording.

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::args::ConvertCliArgs;
use crate::capture::format_size;
use crate::config::Config;
use crate::conversion::ffmpeg::FfmpegTranscoder;
use crate::conversion::{ConversionGateway, OutputFormat};

pub async fn handle_convert_command(args: ConvertCliArgs) -> Result<()> {
    let format: OutputFormat = args.format.parse().map_err(|e: String| anyhow!(e))?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, format));
    if output == args.input {
        bail!("Output would overwrite the input file {:?}", args.input);
    }

    let input = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {:?}", args.input))?;
    if input.is_empty() {
        bail!("Input file {:?} is empty", args.input);
    }

    let config = Config::load()?;
    let gateway = ConversionGateway::new(Box::new(FfmpegTranscoder::new(
        config.conversion.ffmpeg_path(),
    )));

    let spinner = create_spinner(&format!("Converting to {format}..."));
    let result = gateway.finalize(&[Bytes::from(input)], format).await;
    spinner.finish_and_clear();

    let artifact = result.map_err(|failed| anyhow!("Conversion failed: {}", failed.reason))?;
    tokio::fs::write(&output, artifact.bytes())
        .await
        .with_context(|| format!("Failed to write {output:?}"))?;

    info!("Converted {:?} -> {:?}", args.input, output);
    println!(
        "Saved {} ({}, {})",
        output.display(),
        artifact.mime_type(),
        format_size(artifact.len() as u64)
    );
    Ok(())
}

/// `input` with its extension replaced by the target format's.
pub fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_swaps_extension() {
        assert_eq!(
            default_output(Path::new("/tmp/capture.webm"), OutputFormat::Mp4),
            PathBuf::from("/tmp/capture.mp4")
        );
        assert_eq!(
            default_output(Path::new("clip"), OutputFormat::Gif),
            PathBuf::from("clip.gif")
        );
    }

    #[tokio::test]
    async fn test_rejects_unknown_format() {
        let args = ConvertCliArgs {
            input: PathBuf::from("/tmp/in.webm"),
            format: "avi".to_string(),
            output: None,
        };
        assert!(handle_convert_command(args).await.is_err());
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_input() {
        let args = ConvertCliArgs {
            input: PathBuf::from("/tmp/in.webm"),
            format: "webm".to_string(),
            output: None,
        };
        let err = handle_convert_command(args).await.unwrap_err();
        assert!(err.to_string().contains("overwrite"));
    }
}
