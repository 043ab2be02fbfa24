//! Errors for handle lookups

use std::fmt;

/// Why a handle lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Handle is null
    Null,
    /// Handle is stale (its slot was freed)
    Stale,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Null => write!(f, "Handle is null"),
            HandleError::Stale => write!(f, "Handle is stale (already freed)"),
        }
    }
}

impl std::error::Error for HandleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_error_is_std_error() {
        let boxed: Box<dyn std::error::Error> = Box::new(HandleError::Stale);
        assert_eq!(boxed.to_string(), "Handle is stale (already freed)");
        assert_eq!(HandleError::Null.to_string(), "Handle is null");
    }
}
