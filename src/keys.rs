//! Key generation and management

use log::debug;
use num_bigint::BigUint;
use rand::{thread_rng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TallyError};
use crate::params::GroupParameters;
use crate::utils::{mod_exp, parse_decimal, random_in_range_with};

/// ElGamal public key `y = g^x mod p`
///
/// Safe to publish. Crosses boundaries as a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey {
    #[serde(with = "crate::serde_decimal")]
    pub(crate) y: BigUint,
}

impl PublicKey {
    /// Wrap a public component, checking it is a residue in `(1, p)`
    pub fn new(y: BigUint, params: &GroupParameters) -> Result<Self> {
        let public_key = PublicKey { y };
        public_key.validate(params)?;
        Ok(public_key)
    }

    /// Check the public component is a residue in `(1, p)`
    pub fn validate(&self, params: &GroupParameters) -> Result<()> {
        if self.y <= BigUint::from(1u32) || &self.y >= params.modulus() {
            return Err(TallyError::Range(format!(
                "public key {} is not in (1, p)",
                self.y
            )));
        }
        Ok(())
    }

    /// Parse a decimal public key string
    pub fn from_decimal(s: &str, params: &GroupParameters) -> Result<Self> {
        let y = parse_decimal(s)
            .ok_or_else(|| TallyError::Range(format!("public key {:?} is not decimal", s)))?;
        Self::new(y, params)
    }

    /// Get the public component (g^x mod p)
    pub fn value(&self) -> &BigUint {
        &self.y
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.y)
    }
}

/// ElGamal private key `x`
///
/// Not `Serialize`. Leaves process memory only as a
/// [`SealedSecret`](crate::vault::SealedSecret).
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub(crate) x: BigUint,
}

impl PrivateKey {
    /// Wrap a secret exponent, checking it lies in `[2, p-2]`
    pub fn new(x: BigUint, params: &GroupParameters) -> Result<Self> {
        if x < BigUint::from(2u32) || x > params.modulus() - 2u32 {
            return Err(TallyError::Range(
                "private key is not in [2, p-2]".to_string(),
            ));
        }
        Ok(PrivateKey { x })
    }

    /// Parse the decimal form produced by [`PrivateKey::to_decimal`]
    pub fn from_decimal(s: &str, params: &GroupParameters) -> Result<Self> {
        let x = parse_decimal(s)
            .ok_or_else(|| TallyError::Range("private key is not a decimal integer".to_string()))?;
        Self::new(x, params)
    }

    /// Decimal text of the secret exponent, for sealing
    pub fn to_decimal(&self) -> String {
        self.x.to_str_radix(10)
    }

    /// Get the secret exponent
    pub fn secret_exponent(&self) -> &BigUint {
        &self.x
    }

    /// Derive the matching public key
    pub fn public_key(&self, params: &GroupParameters) -> PublicKey {
        PublicKey {
            y: mod_exp(params.generator(), &self.x, params.modulus()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(***)")
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(***)")
    }
}

/// ElGamal key pair for one election
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    /// Generate a key pair using the thread-local CSPRNG
    ///
    /// # Example
    ///
    /// ```rust
    /// use elgamal_tally::{GroupParameters, KeyPair};
    ///
    /// let params = GroupParameters::reference();
    /// let keypair = KeyPair::generate(&params).expect("Failed to generate keys");
    /// assert_eq!(keypair.private_key.public_key(&params), keypair.public_key);
    /// ```
    pub fn generate(params: &GroupParameters) -> Result<Self> {
        Self::generate_with_rng(params, &mut thread_rng())
    }

    /// Generate a key pair from the given CSPRNG
    pub fn generate_with_rng<R>(params: &GroupParameters, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng,
    {
        params
            .validate()
            .map_err(|err| TallyError::Range(format!("cannot generate keys: {}", err)))?;

        // x uniform in [2, p-2], redrawn if g^x lands on the identity
        let low = BigUint::from(2u32);
        let high = params.modulus() - 2u32;
        let keypair = loop {
            let x = random_in_range_with(rng, &low, &high)?;
            if let Ok(keypair) = Self::from_exponent(params, x) {
                break keypair;
            }
        };
        debug!(
            "Generated {}-bit key pair, public key {}",
            params.bit_size(),
            keypair.public_key
        );
        Ok(keypair)
    }

    /// Rebuild a key pair from a known secret exponent
    pub fn from_private(params: &GroupParameters, x: BigUint) -> Result<Self> {
        PrivateKey::new(x.clone(), params)?;
        Self::from_exponent(params, x)
    }

    fn from_exponent(params: &GroupParameters, x: BigUint) -> Result<Self> {
        let private_key = PrivateKey { x };
        let public_key = private_key.public_key(params);
        if public_key.y == BigUint::from(1u32) {
            return Err(TallyError::Range(
                "private key is a multiple of the generator order".to_string(),
            ));
        }
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }
}

impl fmt::Display for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair(public {})", self.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_key_generation() {
        let params = GroupParameters::reference();
        let keypair = KeyPair::generate(&params).unwrap();

        let x = keypair.private_key.secret_exponent();
        assert!(x >= &BigUint::from(2u32));
        assert!(x <= &BigUint::from(7917u32));
        assert_eq!(
            keypair.public_key.value(),
            &mod_exp(params.generator(), x, params.modulus())
        );
    }

    #[test]
    fn test_generation_is_deterministic_given_rng() {
        let params = GroupParameters::reference();
        let a = KeyPair::generate_with_rng(&params, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = KeyPair::generate_with_rng(&params, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.private_key, b.private_key);
        assert_eq!(a.public_key, b.public_key);
    }

    #[test]
    fn test_reference_key() {
        let params = GroupParameters::reference();
        let keypair = KeyPair::from_private(&params, BigUint::from(5318u32)).unwrap();
        let expected = BigUint::from(2u32).modpow(&BigUint::from(5318u32), &BigUint::from(7919u32));
        assert_eq!(keypair.public_key.value(), &expected);
    }

    #[test]
    fn test_private_key_range() {
        let params = GroupParameters::reference();
        assert!(KeyPair::from_private(&params, BigUint::from(1u32)).is_err());
        assert!(KeyPair::from_private(&params, BigUint::from(7918u32)).is_err());
        assert!(KeyPair::from_private(&params, BigUint::from(2u32)).is_ok());
        assert!(KeyPair::from_private(&params, BigUint::from(7917u32)).is_ok());
    }

    #[test]
    fn test_private_key_is_redacted() {
        let params = GroupParameters::reference();
        let keypair = KeyPair::from_private(&params, BigUint::from(5318u32)).unwrap();
        assert!(!format!("{:?}", keypair).contains("5318"));
        assert!(!format!("{}", keypair.private_key).contains("5318"));
    }

    #[test]
    fn test_decimal_round_trip() {
        let params = GroupParameters::reference();
        let keypair = KeyPair::from_private(&params, BigUint::from(5318u32)).unwrap();

        let text = keypair.private_key.to_decimal();
        assert_eq!(text, "5318");
        assert_eq!(
            PrivateKey::from_decimal(&text, &params).unwrap(),
            keypair.private_key
        );

        let public = keypair.public_key.to_string();
        assert_eq!(
            PublicKey::from_decimal(&public, &params).unwrap(),
            keypair.public_key
        );
        assert!(PublicKey::from_decimal("1", &params).is_err());
        assert!(PublicKey::from_decimal("7919", &params).is_err());
    }

    #[test]
    fn test_public_key_validate() {
        let params = GroupParameters::reference();
        let keypair = KeyPair::from_private(&params, BigUint::from(5318u32)).unwrap();
        assert!(keypair.public_key.validate(&params).is_ok());

        // Deserialization skips the range check, so imported keys are validated
        let one: PublicKey = serde_json::from_str("\"1\"").unwrap();
        assert!(matches!(one.validate(&params), Err(TallyError::Range(_))));
        let large: PublicKey = serde_json::from_str("\"7919\"").unwrap();
        assert!(matches!(large.validate(&params), Err(TallyError::Range(_))));
    }
}
