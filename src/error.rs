use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single icon in a batch.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("icon size must be positive")]
    InvalidSize,

    #[error("icon size {size} exceeds the maximum of {max}")]
    SizeTooLarge { size: u32, max: u32 },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[cfg(feature = "render")]
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }
}
