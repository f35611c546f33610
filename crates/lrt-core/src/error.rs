use thiserror::Error;

/// Errors raised while normalizing or validating a [`crate::normalize::ParsedLaw`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("incoherent input for field `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
