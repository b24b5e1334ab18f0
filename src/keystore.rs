//! The tallying authority's key store
//!
//! Holds at most one active key pair per election: the public key in the clear and the
//! private key only in sealed form. The private key is unsealed on demand with the
//! operator's external key and dropped after use. Generating or importing a second key
//! pair requires an explicit [`KeyStore::destroy`] first.

use log::{info, warn};

use crate::decryption::TallyDecoder;
use crate::encryption::VoteEncoder;
use crate::error::{Result, TallyError};
use crate::keys::{KeyPair, PrivateKey, PublicKey};
use crate::params::GroupParameters;
use crate::types::AggregatedResult;
use crate::vault::{SealedSecret, SecretVault};

/// Bound used by [`KeyStore::self_test`]; a single vote needs nothing larger
const SELF_TEST_BOUND: u64 = 2;

#[derive(Clone, Debug)]
struct ActiveKey {
    public_key: PublicKey,
    sealed_private_key: SealedSecret,
}

/// Single-election key store with an explicit "already initialized" state
#[derive(Clone, Debug)]
pub struct KeyStore {
    params: GroupParameters,
    vault: SecretVault,
    active: Option<ActiveKey>,
}

impl KeyStore {
    /// Empty key store for one election
    pub fn new(params: GroupParameters, vault: SecretVault) -> Self {
        KeyStore {
            params,
            vault,
            active: None,
        }
    }

    pub fn params(&self) -> &GroupParameters {
        &self.params
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    /// Generate a key pair and keep only its sealed private key
    pub fn initialize(&mut self, external_key: &str) -> Result<&PublicKey> {
        if self.is_initialized() {
            return Err(TallyError::KeyStoreInitialized);
        }

        let keypair = KeyPair::generate(&self.params)?;
        let sealed_private_key = self
            .vault
            .seal(&keypair.private_key.to_decimal(), external_key)?;

        info!("Initialized key store with public key {}", keypair.public_key);
        let active = self.active.insert(ActiveKey {
            public_key: keypair.public_key,
            sealed_private_key,
        });
        Ok(&active.public_key)
    }

    /// Load a previously exported key pair
    ///
    /// The sealed key is not opened here; a mismatch surfaces on [`KeyStore::unlock`].
    pub fn import(&mut self, public_key: PublicKey, sealed_private_key: SealedSecret) -> Result<()> {
        if self.is_initialized() {
            return Err(TallyError::KeyStoreInitialized);
        }
        public_key.validate(&self.params)?;

        info!("Imported key pair with public key {}", public_key);
        self.active = Some(ActiveKey {
            public_key,
            sealed_private_key,
        });
        Ok(())
    }

    /// Drop the active key pair, allowing a new one to be generated
    pub fn destroy(&mut self) -> Result<()> {
        match self.active.take() {
            Some(active) => {
                info!("Destroyed key pair with public key {}", active.public_key);
                Ok(())
            }
            None => Err(TallyError::KeyStoreEmpty),
        }
    }

    /// The publishable public key
    pub fn public_key(&self) -> Result<&PublicKey> {
        Ok(&self.active()?.public_key)
    }

    /// The only exportable form of the private key
    pub fn sealed_private_key(&self) -> Result<&SealedSecret> {
        Ok(&self.active()?.sealed_private_key)
    }

    /// Unseal the private key and check it matches the public key
    pub fn unlock(&self, external_key: &str) -> Result<PrivateKey> {
        let active = self.active()?;
        let text = self
            .vault
            .unseal(&active.sealed_private_key, external_key)?;

        let private_key = PrivateKey::from_decimal(&text, &self.params).map_err(|_| {
            TallyError::Decryption("unsealed value is not a private key".to_string())
        })?;

        if private_key.public_key(&self.params) != active.public_key {
            return Err(TallyError::Decryption(
                "unsealed private key does not match the public key".to_string(),
            ));
        }
        Ok(private_key)
    }

    /// Encoder for ballots under the active public key
    pub fn encoder(&self) -> Result<VoteEncoder> {
        Ok(VoteEncoder::new(
            self.params.clone(),
            self.public_key()?.clone(),
        ))
    }

    /// Decode every candidate of a ledger result
    ///
    /// Key problems fail the whole call; per-candidate search failures come back in
    /// their slot so the caller can report them as out-of-range results.
    pub fn decrypt_results(
        &self,
        aggregated: &AggregatedResult,
        external_key: &str,
        bound: u64,
    ) -> Result<Vec<Result<u64>>> {
        let private_key = self.unlock(external_key)?;
        let decoder = TallyDecoder::new(self.params.clone(), bound)?;

        let results = decoder.decrypt_results(aggregated, &private_key);
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(
                "{} of {} candidate tallies could not be decoded",
                failed,
                results.len()
            );
        } else {
            info!("Decoded {} candidate tallies", results.len());
        }
        Ok(results)
    }

    /// Encrypt a single vote under the stored public key and decode it again
    pub fn self_test(&self, external_key: &str) -> Result<()> {
        let private_key = self.unlock(external_key)?;
        let ballot = self.encoder()?.encrypt_vote(&[1])?;

        let decoder = TallyDecoder::new(self.params.clone(), SELF_TEST_BOUND)?;
        let decoded = decoder.decrypt(&ballot[0], &private_key)?;
        if decoded != 1 {
            return Err(TallyError::Range(format!(
                "self test decoded {} instead of 1",
                decoded
            )));
        }

        info!("Key store self test passed");
        Ok(())
    }

    fn active(&self) -> Result<&ActiveKey> {
        self.active.as_ref().ok_or(TallyError::KeyStoreEmpty)
    }
}
