use thiserror::Error;

/// Errors that can occur during message bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Bus connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Exchange not declared: {0}")]
    ExchangeNotFound(String),
    #[error("Queue not found: {0}")]
    QueueNotFound(String),
    #[error("Publish failed: {0}")]
    PublishFailed(String),
    #[error("Bus operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_not_found_display() {
        let error = BusError::ExchangeNotFound("feed".to_string());
        assert_eq!(error.to_string(), "Exchange not declared: feed");
    }

    #[test]
    fn test_publish_failed_display() {
        let error = BusError::PublishFailed("channel closed".to_string());
        assert_eq!(error.to_string(), "Publish failed: channel closed");
    }
}
