//! Cover image loading and saving.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while handling cover images.
#[derive(Debug, Error)]
pub enum CoverError {
    #[error("Failed to read cover image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized cover image format: {path}")]
    UnknownFormat { path: PathBuf },

    #[error("Failed to write cover image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scale cover image: {reason}")]
    ScaleFailed { reason: String },
}

impl CoverError {
    pub fn scale_failed(reason: impl Into<String>) -> Self {
        Self::ScaleFailed {
            reason: reason.into(),
        }
    }
}

/// Image container of a cover, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if data.starts_with(b"BM") {
            Some(Self::Bmp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
        }
    }
}

/// A cover image together with the size it should be saved at.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub source: PathBuf,
    pub data: Vec<u8>,
    pub format: ImageFormat,
    /// Bounding box for the saved image; `None` keeps the original size.
    pub scale: Option<u32>,
}

impl CoverImage {
    /// Reads an image file and detects its format.
    pub fn load(path: &Path, scale: Option<u32>) -> Result<Self, CoverError> {
        let data = std::fs::read(path).map_err(|source| CoverError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let format = ImageFormat::detect(&data).ok_or_else(|| CoverError::UnknownFormat {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            source: path.to_path_buf(),
            data,
            format,
            scale,
        })
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Writes a cover image to disk, scaling it when requested.
pub trait CoverProcessor: Send + Sync {
    fn save_as(&self, image: &CoverImage, dest: &Path) -> Result<(), CoverError>;
}

/// Cover processor that scales through ffmpeg and copies bytes otherwise.
pub struct FfmpegCoverProcessor {
    ffmpeg_path: PathBuf,
}

impl FfmpegCoverProcessor {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    fn scale_args(image: &CoverImage, size: u32, dest: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            image.source.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!(
                "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease",
                size, size
            ),
            "-frames:v".to_string(),
            "1".to_string(),
            dest.to_string_lossy().to_string(),
        ]
    }
}

impl Default for FfmpegCoverProcessor {
    fn default() -> Self {
        Self::new(PathBuf::from("ffmpeg"))
    }
}

impl CoverProcessor for FfmpegCoverProcessor {
    fn save_as(&self, image: &CoverImage, dest: &Path) -> Result<(), CoverError> {
        let write_err = |source| CoverError::Write {
            path: dest.to_path_buf(),
            source,
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let size = match image.scale {
            Some(size) if size > 0 => size,
            _ => return std::fs::write(dest, &image.data).map_err(write_err),
        };

        debug!(source = %image.source.display(), dest = %dest.display(), size, "Scaling cover");

        let output = Command::new(&self.ffmpeg_path)
            .args(Self::scale_args(image, size, dest))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CoverError::scale_failed(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(CoverError::scale_failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}
