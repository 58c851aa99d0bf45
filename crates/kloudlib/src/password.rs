//! Generation of passwords for credentials a user didn't provide.
use rand::{Rng, distr::Alphanumeric};

/// The length of passwords generated by components.
pub const DEFAULT_PASSWORD_LENGTH: usize = 32;

/// A source of random passwords.
pub trait PasswordGenerator {
    /// Generates a password of exactly `length` characters.
    fn generate(&self, length: usize) -> String;
}

/// Generates alphanumeric passwords (no special characters) from the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomPasswordGenerator;

impl PasswordGenerator for RandomPasswordGenerator {
    fn generate(&self, length: usize) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}
