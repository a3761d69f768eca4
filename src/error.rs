use crate::users::model::ValidationErrors;

/// Why a submission did not produce a stored user.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Validation error(s): {0}")]
    Validation(#[from] ValidationErrors),
    /// Any failure past validation. Connectivity and constraint errors are not told apart.
    #[error("Server error: {0:#}")]
    Server(#[from] anyhow::Error),
}
