/// Errors that can occur during registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("endpoint already exists: {0}")]
    DuplicateEndpoint(String),

    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),
}
