//! Vote encoding: one exponential ElGamal ciphertext per candidate

use num_bigint::BigUint;
use num_traits::One;
use rand::{thread_rng, CryptoRng, RngCore};

use crate::error::{Result, TallyError};
use crate::keys::PublicKey;
use crate::params::GroupParameters;
use crate::types::{Ciphertext, VoteVector};
use crate::utils::{mod_exp, random_in_range_with};

/// Encrypt a ballot under the authority's public key
///
/// Each entry `m` becomes `(g^r, g^m * y^r) mod p` with its own fresh `r`.
///
/// ```rust
/// use elgamal_tally::{encrypt_vote, GroupParameters, KeyPair};
///
/// let params = GroupParameters::reference();
/// let keypair = KeyPair::generate(&params).unwrap();
/// let ballot = encrypt_vote(&[0, 1, 0], &keypair.public_key, &params).unwrap();
/// assert_eq!(ballot.len(), 3);
/// ```
pub fn encrypt_vote(
    choices: &[u64],
    public_key: &PublicKey,
    params: &GroupParameters,
) -> Result<VoteVector> {
    VoteEncoder::new(params.clone(), public_key.clone()).encrypt_vote(choices)
}

/// Encrypts ballots for one election
#[derive(Clone, Debug)]
pub struct VoteEncoder {
    params: GroupParameters,
    public_key: PublicKey,
}

impl VoteEncoder {
    pub fn new(params: GroupParameters, public_key: PublicKey) -> Self {
        VoteEncoder { params, public_key }
    }

    pub fn params(&self) -> &GroupParameters {
        &self.params
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Encrypt every slot of a ballot with the thread-local CSPRNG
    pub fn encrypt_vote(&self, choices: &[u64]) -> Result<VoteVector> {
        self.encrypt_vote_with_rng(choices, &mut thread_rng())
    }

    /// Encrypt every slot of a ballot, drawing randomness from `rng`
    pub fn encrypt_vote_with_rng<R>(&self, choices: &[u64], rng: &mut R) -> Result<VoteVector>
    where
        R: RngCore + CryptoRng,
    {
        if choices.is_empty() {
            return Err(TallyError::Range(
                "choice vector must not be empty".to_string(),
            ));
        }

        // Validate everything before consuming randomness
        for (i, &m) in choices.iter().enumerate() {
            self.check_exponent(i, m)?;
        }

        let low = BigUint::one();
        let high = self.params.modulus() - 2u32;
        choices
            .iter()
            .map(|&m| {
                let r = random_in_range_with(rng, &low, &high)?;
                Ok(self.encrypt_exponent_with_randomness(m, &r))
            })
            .collect()
    }

    /// Encrypt a single exponent with caller-supplied randomness
    ///
    /// Deterministic; for tests and known-answer vectors. Reusing `r` across
    /// ciphertexts breaks indistinguishability.
    pub fn encrypt_exponent_with_randomness(&self, m: u64, r: &BigUint) -> Ciphertext {
        let p = self.params.modulus();
        let g = self.params.generator();

        let c1 = mod_exp(g, r, p);

        // Encode message in exponent: g^m
        let g_m = mod_exp(g, &BigUint::from(m), p);
        let y_r = mod_exp(&self.public_key.y, r, p);
        let c2 = (g_m * y_r) % p;

        Ciphertext::new(c1, c2)
    }

    fn check_exponent(&self, index: usize, m: u64) -> Result<()> {
        // Exponents wrap at the group order, so anything >= p - 1 is ambiguous
        if BigUint::from(m) >= self.params.group_order() {
            return Err(TallyError::Range(format!(
                "choice {} at index {} is not below p - 1",
                m, index
            )));
        }
        Ok(())
    }
}
