use thiserror::Error;

/// Failures surfaced by a single annotation cycle or by worker entry points.
///
/// Cycle-level variants never escape the worker loop; they are reported to the
/// [`CycleObserver`](crate::CycleObserver) and the previous published result is
/// kept. `Stopped` and `QueueFull` are returned synchronously from `submit`.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("image compression failed: {0}")]
    Encoding(#[from] image::ImageError),
    #[error("invalid image buffer: {0}")]
    InvalidImage(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("annotation endpoint returned {code} {reason}")]
    Status { code: u16, reason: String },
    #[error("malformed response body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("worker is stopped")]
    Stopped,
    #[error("submission queue is full")]
    QueueFull,
}
