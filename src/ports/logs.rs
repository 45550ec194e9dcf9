//! Log delivery port.

use async_trait::async_trait;

use super::ApiError;

/// One log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Message body.
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// CloudWatch Logs.
#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Creates a log group.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AlreadyExists`] when the group exists.
    async fn create_log_group(&self, group: &str) -> Result<(), ApiError>;

    /// Creates a log stream in a group.
    ///
    /// # Errors
    ///
    /// Returns an error when the group is missing or access is denied.
    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ApiError>;

    /// Writes events to a stream.
    ///
    /// # Errors
    ///
    /// Returns an error when the stream is missing or access is denied.
    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> Result<(), ApiError>;
}
