//! External media conversion tools
//!
//! Thumbnails, transcodes and document conversion are delegated to `ffmpeg`,
//! `ffprobe`, `pdftoppm` and `libreoffice`. Calls are synchronous; async
//! callers go through [`run_blocking`].
//!
//! Every output goes to a destination chosen by the caller. Tools never
//! overwrite an existing file there.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Conversion errors
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Tool binary not found in PATH
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    /// Failed to launch the tool
    #[error("Failed to execute {tool}: {message}")]
    Execution { tool: String, message: String },

    /// Tool ran but exited unsuccessfully
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Tool reported success but the expected output is missing
    #[error("Expected output not produced: {0}")]
    MissingOutput(String),

    /// No conversion exists for this input
    #[error("Unsupported media: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task panicked or was cancelled
    #[error("Conversion task failed: {0}")]
    Join(String),
}

/// Stream codecs reported by ffprobe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecReport {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Video is H.264 (if present) and audio is AAC or MP3 (if present)
    pub recommended: bool,
}

impl CodecReport {
    pub fn new(video_codec: Option<String>, audio_codec: Option<String>) -> Self {
        let video_ok = video_codec.as_deref().map_or(true, |c| c == "h264");
        let audio_ok = audio_codec
            .as_deref()
            .map_or(true, |c| matches!(c, "aac" | "mp3"));
        Self {
            recommended: video_ok && audio_ok,
            video_codec,
            audio_codec,
        }
    }
}

/// Media conversion collaborator
pub trait MediaConverter: Send + Sync {
    /// Write a JPEG thumbnail of `source` to `dest`
    fn generate_thumbnail(&self, source: &Path, mime_type: &str, dest: &Path) -> Result<(), ConversionError>;

    /// Extract the audio track of a video into `dest` (MP3)
    fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), ConversionError>;

    /// Transcode a video to H.264/AAC MP4 at `dest`
    fn transcode_compatible(&self, video: &Path, dest: &Path) -> Result<(), ConversionError>;

    /// Convert audio (WMA) to MP3 at `dest`
    fn convert_audio_to_mp3(&self, source: &Path, dest: &Path) -> Result<(), ConversionError>;

    /// Convert an office document to PDF at `dest`
    fn convert_document_to_pdf(&self, document: &Path, dest: &Path) -> Result<(), ConversionError>;

    /// Report the first video and audio stream codecs
    fn probe_codecs(&self, path: &Path) -> Result<CodecReport, ConversionError>;
}

/// Run a converter call on the blocking thread pool
pub async fn run_blocking<T, F>(converter: &Arc<dyn MediaConverter>, job: F) -> Result<T, ConversionError>
where
    T: Send + 'static,
    F: FnOnce(&dyn MediaConverter) -> Result<T, ConversionError> + Send + 'static,
{
    let converter = Arc::clone(converter);
    tokio::task::spawn_blocking(move || job(converter.as_ref()))
        .await
        .map_err(|e| ConversionError::Join(e.to_string()))?
}

/// Default output path `<out_dir>/<stem><suffix>`
pub fn sibling_path(source: &Path, out_dir: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out_dir.join(format!("{}{}", stem, suffix))
}

/// [`MediaConverter`] backed by the command-line tools
#[derive(Debug, Clone)]
pub struct CommandConverter {
    ffmpeg: String,
    ffprobe: String,
    pdftoppm: String,
    libreoffice: String,
}

impl Default for CommandConverter {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            libreoffice: "libreoffice".to_string(),
        }
    }
}

impl CommandConverter {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self, command: &mut Command) -> Result<Output, ConversionError> {
        let tool = command.get_program().to_string_lossy().into_owned();
        debug!(tool = %tool, args = ?command.get_args().collect::<Vec<_>>(), "Running conversion tool");

        let output = command.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConversionError::ToolNotFound(tool.clone())
            } else {
                ConversionError::Execution {
                    tool: tool.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::Failed {
                tool,
                status: output.status.to_string(),
                stderr: stderr.lines().last().unwrap_or_default().to_string(),
            });
        }

        Ok(output)
    }

    /// Run a command and require `dest` to exist afterwards
    fn run_to(&self, command: &mut Command, dest: &Path) -> Result<(), ConversionError> {
        self.run(command)?;
        if !dest.exists() {
            return Err(ConversionError::MissingOutput(dest.display().to_string()));
        }
        Ok(())
    }

    /// ffmpeg refusing to overwrite its output
    fn ffmpeg_command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command.arg("-n");
        command
    }

    /// ffmpeg for thumbnails, which replace their own previous output
    fn thumbnail_command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command.arg("-y");
        command
    }

    fn probe_stream(&self, path: &Path, selector: &str) -> Result<Option<String>, ConversionError> {
        let output = self.run(
            Command::new(&self.ffprobe)
                .args(["-v", "error", "-select_streams", selector])
                .args(["-show_entries", "stream=codec_name", "-of", "default=nw=1"])
                .arg(path),
        )?;

        Ok(parse_codec_line(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `codec_name=h264` style ffprobe output
fn parse_codec_line(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let codec = line.rsplit('=').next()?.trim();
    (!codec.is_empty()).then(|| codec.to_string())
}

impl MediaConverter for CommandConverter {
    fn generate_thumbnail(&self, source: &Path, mime_type: &str, dest: &Path) -> Result<(), ConversionError> {
        if mime_type == "application/pdf" {
            // pdftoppm appends ".jpg" to the output prefix
            let prefix = dest.with_extension("thumbtmp");
            let produced = dest.with_extension("thumbtmp.jpg");
            self.run_to(
                Command::new(&self.pdftoppm)
                    .args(["-jpeg", "-f", "1", "-l", "1", "-scale-to", "300", "-singlefile"])
                    .arg(source)
                    .arg(&prefix),
                &produced,
            )?;
            std::fs::rename(&produced, dest)?;
            return Ok(());
        }

        if mime_type.starts_with("video/") {
            return self.run_to(
                self.thumbnail_command()
                    .args(["-ss", "00:00:03", "-i"])
                    .arg(source)
                    .args(["-frames:v", "1", "-vf", "scale=320:-1"])
                    .args(["-f", "image2", "-vcodec", "mjpeg"])
                    .arg(dest),
                dest,
            );
        }

        if mime_type.starts_with("image/") {
            return self.run_to(
                self.thumbnail_command()
                    .arg("-i")
                    .arg(source)
                    .args(["-frames:v", "1", "-vf", "scale=300:300:force_original_aspect_ratio=decrease"])
                    .args(["-f", "image2", "-vcodec", "mjpeg"])
                    .arg(dest),
                dest,
            );
        }

        Err(ConversionError::Unsupported(mime_type.to_string()))
    }

    fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), ConversionError> {
        self.run_to(
            self.ffmpeg_command()
                .arg("-i")
                .arg(video)
                .args(["-q:a", "0", "-map", "a"])
                .arg(dest),
            dest,
        )
    }

    fn transcode_compatible(&self, video: &Path, dest: &Path) -> Result<(), ConversionError> {
        self.run_to(
            self.ffmpeg_command()
                .arg("-i")
                .arg(video)
                .args(["-c:v", "libx264", "-c:a", "aac", "-preset", "fast", "-crf", "23"])
                .arg(dest),
            dest,
        )
    }

    fn convert_audio_to_mp3(&self, source: &Path, dest: &Path) -> Result<(), ConversionError> {
        self.run_to(
            self.ffmpeg_command()
                .arg("-i")
                .arg(source)
                .args(["-acodec", "libmp3lame"])
                .arg(dest),
            dest,
        )
    }

    fn convert_document_to_pdf(&self, document: &Path, dest: &Path) -> Result<(), ConversionError> {
        if dest.exists() {
            return Err(ConversionError::Execution {
                tool: self.libreoffice.clone(),
                message: format!("{} already exists", dest.display()),
            });
        }

        // libreoffice always writes `<stem>.pdf` into --outdir, so it gets a
        // private scratch folder and the result is moved into place
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let scratch = parent.join(format!(".convert-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&scratch)?;

        let produced = sibling_path(document, &scratch, ".pdf");
        let result = self
            .run_to(
                Command::new(&self.libreoffice)
                    .args(["--headless", "--convert-to", "pdf", "--outdir"])
                    .arg(&scratch)
                    .arg(document),
                &produced,
            )
            .and_then(|()| std::fs::rename(&produced, dest).map_err(ConversionError::from));

        if let Err(e) = std::fs::remove_dir_all(&scratch) {
            warn!(path = %scratch.display(), error = %e, "Failed to remove conversion scratch folder");
        }
        result
    }

    fn probe_codecs(&self, path: &Path) -> Result<CodecReport, ConversionError> {
        let video = self.probe_stream(path, "v:0")?;
        let audio = self.probe_stream(path, "a:0")?;
        Ok(CodecReport::new(video, audio))
    }
}
