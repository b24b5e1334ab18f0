//! Core types and data structures

use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TallyError};
use crate::params::GroupParameters;

/// ElGamal ciphertext (c1, c2) in exponential form
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ciphertext {
    #[serde(with = "crate::serde_decimal")]
    pub(crate) c1: BigUint,
    #[serde(with = "crate::serde_decimal")]
    pub(crate) c2: BigUint,
}

impl Ciphertext {
    /// Create a new ciphertext
    pub fn new(c1: BigUint, c2: BigUint) -> Self {
        Ciphertext { c1, c2 }
    }

    /// The identity ciphertext `(1, 1)`, a randomness-free encryption of zero
    ///
    /// Ledgers start their running product from this value.
    pub fn identity() -> Self {
        Ciphertext {
            c1: BigUint::one(),
            c2: BigUint::one(),
        }
    }

    /// Get the first component
    pub fn c1(&self) -> &BigUint {
        &self.c1
    }

    /// Get the second component
    pub fn c2(&self) -> &BigUint {
        &self.c2
    }

    /// Check both components are residues in `[0, p)`
    pub fn check_range(&self, params: &GroupParameters) -> Result<()> {
        params.check_residue("c1", &self.c1)?;
        params.check_residue("c2", &self.c2)
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.c1, self.c2)
    }
}

/// One voter's ballot: one ciphertext per candidate, index-aligned
pub type VoteVector = Vec<Ciphertext>;

/// Ledger output: the product of all accepted ballots, one ciphertext per candidate
pub type AggregatedResult = Vec<Ciphertext>;

/// Plaintext exponents for one ballot, checked non-empty and non-negative
///
/// Canonically one-hot, but any small counts are allowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceVector(Vec<u64>);

impl ChoiceVector {
    /// Wrap unsigned choices, rejecting an empty ballot
    pub fn new(choices: Vec<u64>) -> Result<Self> {
        if choices.is_empty() {
            return Err(TallyError::Range(
                "choice vector must not be empty".to_string(),
            ));
        }
        Ok(ChoiceVector(choices))
    }

    /// One-hot ballot selecting `chosen` out of `candidates`
    pub fn one_hot(candidates: usize, chosen: usize) -> Result<Self> {
        if chosen >= candidates {
            return Err(TallyError::Range(format!(
                "candidate index {} out of range for {} candidates",
                chosen, candidates
            )));
        }
        let mut choices = vec![0; candidates];
        choices[chosen] = 1;
        Self::new(choices)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&[i64]> for ChoiceVector {
    type Error = TallyError;

    fn try_from(values: &[i64]) -> Result<Self> {
        let choices = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                u64::try_from(v).map_err(|_| {
                    TallyError::Range(format!("choice {} at index {} is negative", v, i))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(choices)
    }
}

/// Parses comma-separated integers such as `"0,1,0"`
///
/// Blank input is an empty ballot; a blank field anywhere else is an error, since
/// dropping it would shift later choices onto other candidates.
impl FromStr for ChoiceVector {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Self::new(Vec::new());
        }

        let values = s
            .split(',')
            .map(str::trim)
            .enumerate()
            .map(|(i, part)| {
                if part.is_empty() {
                    return Err(TallyError::Range(format!("choice at index {} is empty", i)));
                }
                part.parse::<i64>()
                    .map_err(|_| TallyError::Range(format!("choice {:?} is not an integer", part)))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::try_from(values.as_slice())
    }
}

impl AsRef<[u64]> for ChoiceVector {
    fn as_ref(&self) -> &[u64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ciphertext_serializes_as_decimal_strings() {
        let ct = Ciphertext::new(BigUint::from(1234u32), BigUint::from(42u32));
        let json = serde_json::to_string(&ct).unwrap();
        assert_eq!(json, r#"{"c1":"1234","c2":"42"}"#);
        let back: Ciphertext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ct);
    }

    #[test]
    fn test_check_range() {
        let params = GroupParameters::reference();
        assert!(Ciphertext::identity().check_range(&params).is_ok());
        let bad = Ciphertext::new(BigUint::from(7919u32), BigUint::one());
        assert!(matches!(bad.check_range(&params), Err(TallyError::Range(_))));
    }

    #[test]
    fn test_choice_vector_rejects_negative_and_empty() {
        assert!(ChoiceVector::try_from(&[0i64, 1, 0][..]).is_ok());
        assert!(matches!(
            ChoiceVector::try_from(&[0i64, -1][..]),
            Err(TallyError::Range(_))
        ));
        assert!(matches!(ChoiceVector::new(vec![]), Err(TallyError::Range(_))));
    }

    #[test]
    fn test_choice_vector_from_str() {
        let choices: ChoiceVector = "0, 1,0".parse().unwrap();
        assert_eq!(choices.as_slice(), &[0, 1, 0]);
        assert!("0,-1".parse::<ChoiceVector>().is_err());
        assert!("0,x".parse::<ChoiceVector>().is_err());
        assert!("".parse::<ChoiceVector>().is_err());
    }

    #[test]
    fn test_choice_vector_rejects_blank_fields() {
        for input in ["0,,1", "0,1,", ",0,1", "0, ,1"] {
            assert!(
                matches!(input.parse::<ChoiceVector>(), Err(TallyError::Range(_))),
                "input = {:?}",
                input
            );
        }
        assert!(matches!(
            "  ".parse::<ChoiceVector>(),
            Err(TallyError::Range(_))
        ));
    }

    #[test]
    fn test_one_hot() {
        assert_eq!(ChoiceVector::one_hot(3, 1).unwrap().as_slice(), &[0, 1, 0]);
        assert!(ChoiceVector::one_hot(3, 3).is_err());
    }
}
