//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// The given id does not resolve to a live connection
    InvalidConnection(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidConnection(id) => {
                write!(f, "No live connection with id: {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
