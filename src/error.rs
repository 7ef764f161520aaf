//! Error types shared by the setup and broadcast front-ends.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for setup and streaming operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure cases surfaced to the user.
///
/// An unreadable player version and a declined consent question are not
/// errors: the first is modeled as an absent `Option`, the second halts the
/// flow silently.
#[derive(Error, Debug)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to launch {}: {}", .program.display(), .source)]
    Launch {
        program: PathBuf,
        source: io::Error,
    },

    #[error("no video file selected")]
    MissingSource,

    #[error("a stream is already running")]
    StreamActive,

    #[error("invalid HTTP port: {0}")]
    InvalidPort(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
