use crate::Generator;

/// Symbols a generated code is drawn from: lower case, upper case, digits.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const DEFAULT_LENGTH: usize = 8;

/// Generates fixed-length codes with every symbol drawn uniformly from
/// [`ALPHABET`].
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self::with_length(DEFAULT_LENGTH)
    }

    /// # Panics
    ///
    /// Panics if `length` is zero.
    pub fn with_length(length: usize) -> Self {
        assert!(length > 0, "code length must be positive");
        Self { length }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> String {
        std::iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
            .take(self.length)
            .collect()
    }
}
