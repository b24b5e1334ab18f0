//! Error types for the tally engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TallyError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    #[error("Invalid group parameter: {0}")]
    InvalidParameter(String),

    #[error("Value out of range: {0}")]
    Range(String),

    #[error("Failed to unseal secret: {0}")]
    Decryption(String),

    #[error("Discrete log not found below bound {bound}: result outside expected range")]
    DiscreteLogNotFound { bound: u64 },

    #[error("Key store already holds an active key pair; destroy it before generating a new one")]
    KeyStoreInitialized,

    #[error("Key store has no active key pair")]
    KeyStoreEmpty,
}

impl TallyError {
    /// True when a decode exhausted its search space.
    ///
    /// Service layers report this as "result outside expected range", which calls for a
    /// different operator action than a bad key or corrupt input.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, TallyError::DiscreteLogNotFound { .. })
    }
}
