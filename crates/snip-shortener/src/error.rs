use snip_core::StoreError;
use snip_generator::GeneratorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no free short code after {0} attempts")]
    CodeSpaceExhausted(usize),
    #[error("deletion task aborted: {0}")]
    DeletionAborted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GeneratorError> for ShortenerError {
    fn from(value: GeneratorError) -> Self {
        match value {
            GeneratorError::EmptySource => Self::InvalidUrl("url cannot be empty".to_string()),
        }
    }
}
