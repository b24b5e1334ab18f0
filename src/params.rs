//! Group parameters shared by every operation of one election

use num_bigint::BigUint;
use num_integer::Integer;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TallyError};
use crate::utils::{is_probable_prime, parse_decimal};

/// Smallest modulus for which `[2, p-2]` holds a generator
pub const MIN_MODULUS: u32 = 5;

/// Miller-Rabin rounds used by [`GroupParameters::new_checked`]
pub const PRIMALITY_TEST_ROUNDS: usize = 20;

/// Prime modulus `p` and generator `g` of the multiplicative group
///
/// Immutable once constructed. Deserialization goes through the same validation as
/// [`GroupParameters::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGroupParameters")]
pub struct GroupParameters {
    #[serde(with = "crate::serde_decimal")]
    modulus: BigUint,
    #[serde(with = "crate::serde_decimal")]
    generator: BigUint,
}

#[derive(Deserialize)]
struct RawGroupParameters {
    #[serde(with = "crate::serde_decimal")]
    modulus: BigUint,
    #[serde(with = "crate::serde_decimal")]
    generator: BigUint,
}

impl TryFrom<RawGroupParameters> for GroupParameters {
    type Error = TallyError;

    fn try_from(raw: RawGroupParameters) -> Result<Self> {
        GroupParameters::new(raw.modulus, raw.generator)
    }
}

impl GroupParameters {
    /// Create group parameters, trusting the caller that `modulus` is prime
    pub fn new(modulus: BigUint, generator: BigUint) -> Result<Self> {
        let params = GroupParameters { modulus, generator };
        params.validate()?;
        Ok(params)
    }

    /// Create group parameters and verify primality of the modulus
    pub fn new_checked(modulus: BigUint, generator: BigUint) -> Result<Self> {
        let params = Self::new(modulus, generator)?;
        if !is_probable_prime(&params.modulus, PRIMALITY_TEST_ROUNDS) {
            return Err(TallyError::InvalidParameter(format!(
                "modulus {} is not prime",
                params.modulus
            )));
        }
        Ok(params)
    }

    /// Parse decimal strings as exchanged at service boundaries
    pub fn from_decimal(modulus: &str, generator: &str) -> Result<Self> {
        let p = parse_decimal(modulus).ok_or_else(|| {
            TallyError::InvalidParameter(format!("modulus {:?} is not a decimal integer", modulus))
        })?;
        let g = parse_decimal(generator).ok_or_else(|| {
            TallyError::InvalidParameter(format!(
                "generator {:?} is not a decimal integer",
                generator
            ))
        })?;
        Self::new(p, g)
    }

    /// The demonstration group `p = 7919, g = 2`
    ///
    /// Far too small for real elections. Swap in a larger prime for anything else.
    pub fn reference() -> Self {
        GroupParameters {
            modulus: BigUint::from(7919u32),
            generator: BigUint::from(2u32),
        }
    }

    /// Get the prime modulus `p`
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Get the generator `g`
    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    /// `p - 1`, the order of the full multiplicative group
    pub fn group_order(&self) -> BigUint {
        &self.modulus - 1u32
    }

    /// Check `p` odd and at least [`MIN_MODULUS`], and `g` in `[2, p-2]`
    pub fn validate(&self) -> Result<()> {
        if self.modulus < BigUint::from(MIN_MODULUS) {
            return Err(TallyError::InvalidParameter(format!(
                "modulus must be at least {}, got {}",
                MIN_MODULUS, self.modulus
            )));
        }

        if self.modulus.is_even() {
            return Err(TallyError::InvalidParameter(format!(
                "modulus must be odd, got {}",
                self.modulus
            )));
        }

        let two = BigUint::from(2u32);
        if self.generator < two || self.generator > &self.modulus - 2u32 {
            return Err(TallyError::InvalidParameter(format!(
                "generator must be in [2, p-2], got {}",
                self.generator
            )));
        }

        Ok(())
    }

    /// Check a tally bound against the group: `1 <= bound < p - 1`
    ///
    /// The bound is an upper limit on any achievable tally (usually the voter-roll
    /// size plus one). Decoding is unique only when the generator's order also exceeds
    /// it; [`TallyDecoder::new`](crate::decryption::TallyDecoder::new) checks that.
    pub fn check_bound(&self, bound: u64) -> Result<()> {
        if bound == 0 {
            return Err(TallyError::Range("tally bound must be positive".to_string()));
        }
        if BigUint::from(bound) >= self.group_order() {
            return Err(TallyError::Range(format!(
                "tally bound {} must be below p - 1 = {}",
                bound,
                self.group_order()
            )));
        }
        Ok(())
    }

    /// Check that `value` is a residue in `[0, p)`
    pub fn check_residue(&self, name: &str, value: &BigUint) -> Result<()> {
        if value >= &self.modulus {
            return Err(TallyError::Range(format!(
                "{} = {} is not in [0, {})",
                name, value, self.modulus
            )));
        }
        Ok(())
    }

    /// Bit size of the modulus
    pub fn bit_size(&self) -> u64 {
        self.modulus.bits()
    }
}

impl fmt::Display for GroupParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupParameters(p = {}, g = {})", self.modulus, self.generator)
    }
}
