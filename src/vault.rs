//! At-rest protection for the authority's private key
//!
//! Keys are derived from an operator-supplied secret with scrypt and the text is
//! encrypted with AES-256-CBC under a fresh random IV. The sealed form is
//! `"<iv hex>:<ciphertext hex>"`, readable by any scrypt/AES-CBC implementation using
//! the same cost parameters and salt.
//!
//! CBC without a MAC gives confidentiality only. A tampered ciphertext usually fails
//! the padding or UTF-8 check, but can also decrypt to garbage; callers that need
//! integrity must verify the unsealed value themselves (the key store checks
//! `g^x == y`).

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TallyError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const IV_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 32;
const BLOCK_LENGTH: usize = 16;

/// scrypt cost parameters and salt for key derivation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// log2 of the scrypt CPU/memory cost `N`
    pub log_n: u8,
    /// scrypt block size `r`
    pub r: u32,
    /// scrypt parallelism `p`
    pub p: u32,
    /// KDF salt, shared by every sealed value of a deployment
    pub salt: String,
}

impl Default for VaultConfig {
    /// `N = 2^14, r = 8, p = 1` with salt `"salt"`, the defaults of Node's `scryptSync`
    fn default() -> Self {
        VaultConfig {
            log_n: 14,
            r: 8,
            p: 1,
            salt: "salt".to_string(),
        }
    }
}

impl VaultConfig {
    /// Cheap parameters for tests; never use for real secrets
    pub fn for_testing() -> Self {
        VaultConfig {
            log_n: 4,
            ..Self::default()
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }
}

/// A secret encrypted for storage
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SealedSecret {
    iv: [u8; IV_LENGTH],
    ciphertext: Vec<u8>,
}

impl SealedSecret {
    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

impl fmt::Display for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            hex::encode(self.iv),
            hex::encode(&self.ciphertext)
        )
    }
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedSecret({})", self)
    }
}

impl FromStr for SealedSecret {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let (iv_hex, ciphertext_hex) = match parts.as_slice() {
            [iv, ciphertext] => (*iv, *ciphertext),
            _ => {
                return Err(TallyError::Decryption(format!(
                    "expected 2 ':'-separated parts, found {}",
                    parts.len()
                )))
            }
        };

        let iv_bytes = hex::decode(iv_hex)
            .map_err(|err| TallyError::Decryption(format!("invalid IV hex: {}", err)))?;
        let iv: [u8; IV_LENGTH] = iv_bytes.try_into().map_err(|bytes: Vec<u8>| {
            TallyError::Decryption(format!(
                "IV must be {} bytes, got {}",
                IV_LENGTH,
                bytes.len()
            ))
        })?;

        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|err| TallyError::Decryption(format!("invalid ciphertext hex: {}", err)))?;
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LENGTH != 0 {
            return Err(TallyError::Decryption(format!(
                "ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                BLOCK_LENGTH
            )));
        }

        Ok(SealedSecret { iv, ciphertext })
    }
}

impl From<SealedSecret> for String {
    fn from(sealed: SealedSecret) -> String {
        sealed.to_string()
    }
}

impl TryFrom<String> for SealedSecret {
    type Error = TallyError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Symmetric seal/unseal of secrets under an external key
#[derive(Clone, Debug, Default)]
pub struct SecretVault {
    config: VaultConfig,
}

impl SecretVault {
    pub fn new(config: VaultConfig) -> Self {
        SecretVault { config }
    }

    /// Vault with cheap key derivation, for tests
    pub fn for_testing() -> Self {
        Self::new(VaultConfig::for_testing())
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Encrypt `secret_text` under `external_key` with a fresh IV
    pub fn seal(&self, secret_text: &str, external_key: &str) -> Result<SealedSecret> {
        let key = self.derive_key(external_key)?;

        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(secret_text.as_bytes());

        debug!("Sealed {} bytes of secret text", secret_text.len());
        Ok(SealedSecret { iv, ciphertext })
    }

    /// Decrypt a sealed secret
    ///
    /// Fails with `Decryption` on a wrong key detected through padding or UTF-8
    /// checks. See the module docs for what CBC cannot detect.
    pub fn unseal(&self, sealed: &SealedSecret, external_key: &str) -> Result<String> {
        let key = self.derive_key(external_key)?;

        let plaintext = Aes256CbcDec::new(&key.into(), &sealed.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&sealed.ciphertext)
            .map_err(|_| {
                TallyError::Decryption("bad padding: wrong key or corrupt payload".to_string())
            })?;

        String::from_utf8(plaintext).map_err(|_| {
            TallyError::Decryption("plaintext is not UTF-8: wrong key or corrupt payload".to_string())
        })
    }

    /// Parse the `iv:ciphertext` form and unseal it
    pub fn unseal_str(&self, sealed: &str, external_key: &str) -> Result<String> {
        self.unseal(&sealed.parse()?, external_key)
    }

    fn derive_key(&self, external_key: &str) -> Result<[u8; KEY_LENGTH]> {
        let params = scrypt::Params::new(self.config.log_n, self.config.r, self.config.p, KEY_LENGTH)
            .map_err(|err| TallyError::InvalidParameter(format!("scrypt parameters: {}", err)))?;

        let mut key = [0u8; KEY_LENGTH];
        scrypt::scrypt(
            external_key.as_bytes(),
            self.config.salt.as_bytes(),
            &params,
            &mut key,
        )
        .map_err(|err| TallyError::InvalidParameter(format!("scrypt output: {}", err)))?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal_round_trip() {
        let vault = SecretVault::for_testing();
        for secret in ["5318", "", "a longer secret spanning several AES blocks ✓"] {
            let sealed = vault.seal(secret, "operator secret").unwrap();
            assert_eq!(vault.unseal(&sealed, "operator secret").unwrap(), secret);
        }
    }

    #[test]
    fn test_seal_is_randomized() {
        let vault = SecretVault::for_testing();
        let a = vault.seal("5318", "k").unwrap();
        let b = vault.seal("5318", "k").unwrap();
        assert_ne!(a.iv(), b.iv());
        assert_ne!(a.to_string(), b.to_string());
        assert_eq!(vault.unseal(&a, "k").unwrap(), vault.unseal(&b, "k").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let vault = SecretVault::for_testing();
        let sealed = vault.seal("5318", "right").unwrap();
        assert!(matches!(
            vault.unseal(&sealed, "wrong"),
            Err(TallyError::Decryption(_))
        ));
    }

    #[test]
    fn test_string_form() {
        let vault = SecretVault::for_testing();
        let sealed = vault.seal("5318", "k").unwrap();
        let text = sealed.to_string();

        let (iv, ct) = text.split_once(':').unwrap();
        assert_eq!(iv.len(), IV_LENGTH * 2);
        assert_eq!(ct.len(), BLOCK_LENGTH * 2);

        let parsed: SealedSecret = text.parse().unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(vault.unseal_str(&text, "k").unwrap(), "5318");

        let json = serde_json::to_string(&sealed).unwrap();
        assert_eq!(json, format!("\"{}\"", text));
    }

    #[test]
    fn test_malformed_sealed_values() {
        let iv = "00".repeat(IV_LENGTH);
        let block = "ab".repeat(BLOCK_LENGTH);
        let cases = [
            String::new(),
            iv.clone(),
            format!("{}:{}:{}", iv, block, block),
            format!("zz{}:{}", &iv[2..], block),
            format!("{}:{}", &iv[2..], block),
            format!("{}:", iv),
            format!("{}:{}", iv, &block[2..]),
            format!("{}:{}x", iv, &block[1..]),
        ];
        for case in cases {
            assert!(
                matches!(case.parse::<SealedSecret>(), Err(TallyError::Decryption(_))),
                "{:?}",
                case
            );
        }
        assert!(format!("{}:{}", iv, block).parse::<SealedSecret>().is_ok());
    }

    #[test]
    fn test_salt_changes_derived_key() {
        let sealed = SecretVault::for_testing().seal("5318", "k").unwrap();
        let other = SecretVault::new(VaultConfig::for_testing().with_salt("pepper"));
        assert_ne!(other.unseal(&sealed, "k").ok().as_deref(), Some("5318"));
    }

    #[test]
    fn test_default_config_round_trip() {
        let vault = SecretVault::default();
        let sealed = vault.seal("5318", "operator secret").unwrap();
        assert_eq!(vault.unseal(&sealed, "operator secret").unwrap(), "5318");
    }
}
