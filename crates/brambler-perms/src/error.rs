//! Error types for the permissions module.

use thiserror::Error;

use crate::gate::GatedAction;

/// Errors that can occur during permission checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermsError {
    /// The acting principal does not own the affected data.
    #[error("permission denied: {action} requires the owner")]
    PermissionDenied { action: GatedAction },
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
