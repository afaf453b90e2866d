/// User-visible message for a dismiss link whose nonce is missing or stale.
pub const INVALID_NONCE_MESSAGE: &str = "Action failed. Please refresh the page and retry.";

/// User-visible message for an actor without the manage capability.
pub const INSUFFICIENT_PRIVILEGE_MESSAGE: &str = "Cheatin&#8217; huh?";

/// Errors raised by the notice registry.
///
/// `InvalidNonce` and `InsufficientPrivilege` abort the current request; the
/// host shows the message and stops processing.
#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("{}", INVALID_NONCE_MESSAGE)]
    InvalidNonce,
    #[error("{}", INSUFFICIENT_PRIVILEGE_MESSAGE)]
    InsufficientPrivilege,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl NoticeError {
    /// True for the errors that terminate the request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NoticeError::InvalidNonce | NoticeError::InsufficientPrivilege
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_distinct() {
        assert_eq!(NoticeError::InvalidNonce.to_string(), INVALID_NONCE_MESSAGE);
        assert_eq!(
            NoticeError::InsufficientPrivilege.to_string(),
            INSUFFICIENT_PRIVILEGE_MESSAGE
        );
        assert!(NoticeError::InvalidNonce.is_fatal());
        let storage = NoticeError::from(anyhow::anyhow!("disk full"));
        assert!(!storage.is_fatal());
        assert!(storage.to_string().contains("disk full"));
    }
}
