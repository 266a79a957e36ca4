use aws_sdk_sqs::error::{BuildError, SdkError};
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
use aws_sdk_sqs::operation::send_message_batch::SendMessageBatchError;
use thiserror::Error;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Error types for queue operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// Error receiving messages from SQS
    #[error("Failed to receive messages from SQS")]
    ReceiveMessage(#[from] SdkError<ReceiveMessageError>),

    /// Error sending a message batch to SQS
    #[error("Failed to send message batch to SQS")]
    SendMessageBatch(#[from] SdkError<SendMessageBatchError>),

    /// Error deleting message from SQS
    #[error("Failed to delete message from SQS")]
    DeleteMessage(#[from] SdkError<DeleteMessageError>),

    /// An entry of an otherwise accepted batch was rejected
    #[error("Message rejected by SQS: {code} ({message})")]
    EntryRejected {
        /// Error code reported for the entry
        code: String,
        /// Error message reported for the entry
        message: String,
        /// Whether the sender caused the failure
        sender_fault: bool,
    },

    /// A request could not be built from the given message
    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] BuildError),

    /// The transport is unavailable
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

impl QueueError {
    /// Checks if retrying the same operation later may succeed
    ///
    /// Network failures, timeouts and 5xx responses are transient; malformed
    /// requests and client-side rejections are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ReceiveMessage(sdk_err) => Self::check_sdk_error_transient(sdk_err),
            Self::SendMessageBatch(sdk_err) => Self::check_sdk_error_transient(sdk_err),
            Self::DeleteMessage(sdk_err) => Self::check_sdk_error_transient(sdk_err),
            Self::EntryRejected { sender_fault, .. } => !sender_fault,
            Self::Unavailable(_) => true,
            Self::InvalidMessage(_) => false,
        }
    }

    fn check_sdk_error_transient<E>(sdk_err: &SdkError<E>) -> bool {
        match sdk_err {
            SdkError::ServiceError(err) => err.raw().status().as_u16() >= 500,
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_rejection_transience_follows_sender_fault() {
        let sender = QueueError::EntryRejected {
            code: "InvalidParameterValue".to_string(),
            message: "bad body".to_string(),
            sender_fault: true,
        };
        let server = QueueError::EntryRejected {
            code: "InternalError".to_string(),
            message: "try again".to_string(),
            sender_fault: false,
        };

        assert!(!sender.is_transient());
        assert!(server.is_transient());
    }

    #[test]
    fn test_unavailable_is_transient() {
        assert!(QueueError::Unavailable("connection refused".to_string()).is_transient());
    }
}
