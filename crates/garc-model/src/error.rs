use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("runner has no {0} in its metadata")]
    MissingMetadata(&'static str),

    #[error("invalid runner spec: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
