use serde::Deserialize;
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;

use super::tool::{ToolError, ToolRunner};
use super::UnprocessableMedia;

/// Dimensions of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<i64>,
    height: Option<i64>,
}

/// Parses `ffprobe -of json` output of the `streams[0].width/height` shape.
pub fn parse_probe_output(stdout: &str) -> Result<ProbeResult, UnprocessableMedia> {
    let output: ProbeOutput = serde_json::from_str(stdout)
        .map_err(|e| UnprocessableMedia(format!("failed to parse probe output: {e}")))?;

    let stream = output
        .streams
        .first()
        .ok_or_else(|| UnprocessableMedia("no video stream found".to_string()))?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) => Ok(ProbeResult { width, height }),
        _ => Err(UnprocessableMedia(
            "could not determine video dimensions".to_string(),
        )),
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Unprocessable(#[from] UnprocessableMedia),
}

/// Inspects staged files with `ffprobe`.
#[derive(Debug, Clone)]
pub struct MediaProber {
    runner: ToolRunner,
    ffprobe: String,
}

impl MediaProber {
    pub fn new(runner: ToolRunner, ffprobe: impl Into<String>) -> Self {
        Self {
            runner,
            ffprobe: ffprobe.into(),
        }
    }

    pub fn args(path: &Path) -> Vec<&OsStr> {
        let mut args: Vec<&OsStr> = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
        ]
        .iter()
        .map(|arg| OsStr::new(*arg))
        .collect();
        args.push(path.as_os_str());
        args
    }

    pub async fn probe(&self, path: &Path) -> Result<ProbeResult, ProbeError> {
        let output = self.runner.run(&self.ffprobe, Self::args(path)).await?;
        Ok(parse_probe_output(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_stream_dimensions() {
        let probe = parse_probe_output(
            r#"{"programs":[],"streams":[{"width":1920,"height":1080},{"width":320,"height":240}]}"#,
        )
        .unwrap();
        assert_eq!(probe, ProbeResult { width: 1920, height: 1080 });
    }

    #[test]
    fn missing_streams_or_fields_are_unprocessable() {
        assert!(parse_probe_output(r#"{"streams":[]}"#).is_err());
        assert!(parse_probe_output(r#"{}"#).is_err());
        assert!(parse_probe_output(r#"{"streams":[{"width":1920}]}"#).is_err());
        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn zero_dimensions_pass_through_to_classification() {
        let probe = parse_probe_output(r#"{"streams":[{"width":0,"height":1080}]}"#).unwrap();
        assert_eq!(probe.width, 0);
    }

    #[test]
    fn argument_vector_ends_with_path() {
        let args = MediaProber::args(Path::new("/staging/a b;c.mp4"));
        assert_eq!(args.len(), 9);
        assert_eq!(args[8], "/staging/a b;c.mp4");
        assert_eq!(args[5], "stream=width,height");
    }
}
