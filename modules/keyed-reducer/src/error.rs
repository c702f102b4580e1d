use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeyedError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyedError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No action creator bound under name '{0}'")]
    UnknownActionCreator(String),
}

impl KeyedError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        KeyedError::InvalidArgument(message.into())
    }
}
