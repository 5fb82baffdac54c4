//! Application error types.

use std::path::PathBuf;

/// Errors raised while starting the process or feeding frames.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Reading the frame directory or a frame file failed.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured frame directory holds no files.
    #[error("frame directory {} contains no files", .0.display())]
    EmptyFrameDir(PathBuf),

    /// The Prometheus recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// A global tracing subscriber was already set.
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_dir_display() {
        let error = AppError::EmptyFrameDir(PathBuf::from("/tmp/frames"));
        assert_eq!(error.to_string(), "frame directory /tmp/frames contains no files");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let error: AppError = io.into();
        assert!(matches!(error, AppError::Io(_)));
        assert!(error.to_string().contains("missing.png"));
    }
}
