//! # Homomorphic Tally Engine
//!
//! Exponential ElGamal for encrypted vote tallying:
//! - Votes are encrypted per candidate as `(g^r, g^m * y^r) mod p`
//! - An untrusted ledger sums votes by multiplying ciphertexts mod `p`
//! - The authority recovers totals with a bounded baby-step/giant-step discrete log
//! - The authority's private key is kept sealed at rest (scrypt + AES-256-CBC)
//!
//! ## Example
//!
//! ```rust
//! use elgamal_tally::{
//!     encrypt_vote, GroupParameters, HomomorphicOperations, KeyPair, TallyDecoder,
//! };
//!
//! let params = GroupParameters::reference();
//! let keypair = KeyPair::generate(&params).unwrap();
//!
//! // Two voters, three candidates
//! let ballots = vec![
//!     encrypt_vote(&[0, 1, 0], &keypair.public_key, &params).unwrap(),
//!     encrypt_vote(&[0, 0, 1], &keypair.public_key, &params).unwrap(),
//! ];
//!
//! // The ledger's job
//! let aggregated = params.aggregate_votes(&ballots).unwrap();
//!
//! // Bound: at most 2 eligible voters, so every tally is below 3
//! let decoder = TallyDecoder::new(params.clone(), 3).unwrap();
//! let totals: Vec<u64> = decoder
//!     .decrypt_results(&aggregated, &keypair.private_key)
//!     .into_iter()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(totals, vec![0, 1, 1]);
//! ```

pub mod decryption;
pub mod encryption;
pub mod error;
pub mod homomorphic;
pub mod keys;
pub mod keystore;
pub mod params;
pub mod serde_decimal;
pub mod types;
pub mod utils;
pub mod vault;

// Re-export main types for convenience
pub use decryption::{decrypt_tally, TallyDecoder};
pub use encryption::{encrypt_vote, VoteEncoder};
pub use error::{Result, TallyError};
pub use homomorphic::HomomorphicOperations;
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use keystore::KeyStore;
pub use params::GroupParameters;
pub use types::{AggregatedResult, ChoiceVector, Ciphertext, VoteVector};
pub use vault::{SealedSecret, SecretVault, VaultConfig};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
