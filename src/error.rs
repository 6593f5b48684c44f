// One error type for the whole crate.
// Every variant states *where* things went wrong, so a log line is enough to find it.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("window update error: {0}")]
    WindowUpdate(String), // Pushing the framebuffer failed

    #[error("config error: {0}")]
    Config(String), // A tunable is out of range or the file is unreadable
    #[error("manifest error: {0}")]
    Manifest(String), // images.txt could not be fetched

    #[error("failed to decode image {name}: {source}")]
    ImageDecode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("GET {path} returned HTTP {status}")]
    Transport { path: String, status: u16 },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String), // Buffers that must share a size don't
    #[error("operation cancelled")]
    Cancelled, // The owner went away before the work finished
    #[error("loader thread stopped without a result")]
    LoaderStopped, // The background worker panicked
}

pub type Result<T> = std::result::Result<T, Error>;
