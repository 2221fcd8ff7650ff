use thiserror::Error;

/// Errors shown to the user. Provider failures of every kind collapse into
/// [`FetchError::Unavailable`]; the detailed cause only goes to the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Error: The name of the city cannot be empty.")]
    EmptyCity,

    #[error("Error: The city was not found or there is no network.")]
    Unavailable,
}
