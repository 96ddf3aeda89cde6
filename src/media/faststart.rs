use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::staging::StagedFile;
use super::tool::{ToolError, ToolRunner};

/// Remuxes MP4 files so the `moov` atom sits at the front of the container.
/// Streams are copied, never re-encoded.
#[derive(Debug, Clone)]
pub struct FastStartTranscoder {
    runner: ToolRunner,
    ffmpeg: String,
}

impl FastStartTranscoder {
    pub fn new(runner: ToolRunner, ffmpeg: impl Into<String>) -> Self {
        Self {
            runner,
            ffmpeg: ffmpeg.into(),
        }
    }

    /// `<source>.processed.<ext>`, next to the source in the staging directory.
    pub fn output_path(source: &Path) -> PathBuf {
        let ext = source
            .extension()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| OsString::from("mp4"));
        let mut name = source.as_os_str().to_os_string();
        name.push(".processed.");
        name.push(ext);
        PathBuf::from(name)
    }

    pub fn args<'a>(input: &'a Path, output: &'a Path) -> Vec<&'a OsStr> {
        let mut args = vec![OsStr::new("-i"), input.as_os_str()];
        args.extend(
            [
                "-movflags",
                "faststart",
                "-map_metadata",
                "0",
                "-codec",
                "copy",
                "-f",
                "mp4",
            ]
            .iter()
            .map(|arg| OsStr::new(*arg)),
        );
        args.push(output.as_os_str());
        args
    }

    /// Produces the remuxed copy as a new owned temp file. The source is left
    /// untouched. The output is guarded before ffmpeg starts, so a failed or
    /// cancelled remux never leaves it behind.
    pub async fn remux(&self, source: &StagedFile) -> Result<StagedFile, ToolError> {
        let mut output = StagedFile::adopt(Self::output_path(source.path()), 0);

        if let Err(e) = self
            .runner
            .run(&self.ffmpeg, Self::args(source.path(), output.path()))
            .await
        {
            output.release_logged().await;
            return Err(e);
        }

        let size = fs::metadata(output.path())
            .await
            .map_err(|source| ToolError::Io {
                tool: self.ffmpeg.clone(),
                source,
            })?
            .len();
        output.set_size(size);
        Ok(output)
    }
}
