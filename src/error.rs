use crate::store::StoreError;

/// Result type for handler operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Reasons a mutation handler aborts.
///
/// None of these are ever sent to clients; the dispatcher logs them and the
/// missing `getChats` update is the only visible symptom.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
