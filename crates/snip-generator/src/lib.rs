pub mod random;
pub mod seq;

use thiserror::Error;

pub use random::RandomGenerator;
pub use seq::SeqGenerator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("nothing to shorten: source is empty")]
    EmptySource,
}

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage and
/// make no uniqueness promise: the store's write path is what detects a code
/// that is already taken.
pub trait Generator: Send + Sync + 'static {
    /// Produces a new code.
    fn generate(&self) -> String;

    /// Produces a code for `source`, refusing to shorten an empty string.
    fn shorten(&self, source: &str) -> Result<String, GeneratorError> {
        if source.is_empty() {
            return Err(GeneratorError::EmptySource);
        }
        Ok(self.generate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_rejects_empty_source() {
        let generator = SeqGenerator::with_prefix("t");
        assert_eq!(generator.shorten(""), Err(GeneratorError::EmptySource));
    }

    #[test]
    fn shorten_delegates_to_generate() {
        let generator = SeqGenerator::with_prefix("t");
        assert_eq!(generator.shorten("https://example.com").unwrap(), "t000000");
        assert_eq!(generator.generate(), "t000001");
    }
}
