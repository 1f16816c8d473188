//! Error types for the watermark-inpaint crate.

/// Errors that can occur while building masks, inpainting and saving images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mask does not have the same dimensions as the image.
    #[error(
        "mask is {}x{} but image is {}x{}",
        mask.0,
        mask.1,
        image.0,
        image.1
    )]
    MaskSizeMismatch {
        /// Image dimensions `(width, height)`.
        image: (u32, u32),
        /// Mask dimensions `(width, height)`.
        mask: (u32, u32),
    },

    /// Every pixel is marked, so there is nothing to sample from.
    #[error("mask covers the whole image, no source pixels left to sample")]
    NoSourcePixels,

    /// A region description could not be parsed or is empty.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// The inpainting method name is not recognized.
    #[error("unknown inpainting method `{0}` (expected auto, telea or ns)")]
    UnsupportedMethod(String),

    /// The tool name is not recognized.
    #[error("unknown tool `{0}` (expected rect, brush or eraser)")]
    UnknownTool(String),

    /// A command script line failed to parse or execute.
    #[error("script line {line}: {message}")]
    Script {
        /// 1-based line number in the script.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("gif".to_string());
        assert!(unsupported.to_string().contains("gif"));

        let mismatch = Error::MaskSizeMismatch {
            image: (640, 480),
            mask: (320, 240),
        };
        let msg = mismatch.to_string();
        assert!(msg.contains("320x240"));
        assert!(msg.contains("640x480"));

        let script = Error::Script {
            line: 7,
            message: "unknown command `zap`".to_string(),
        };
        assert_eq!(script.to_string(), "script line 7: unknown command `zap`");
    }
}
