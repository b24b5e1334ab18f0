//! Tally decoding: ElGamal decryption followed by a bounded discrete log
//!
//! Decryption yields `g^m mod p`; recovering `m` is a discrete logarithm, tractable only
//! because tallies are small. Baby-step/giant-step solves it in O(sqrt(bound)) time and
//! space, where `bound` is an explicit upper limit on any achievable tally.

use log::{debug, warn};
use num_bigint::BigUint;
use num_integer::Roots;
use num_traits::One;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::error::{Result, TallyError};
use crate::keys::PrivateKey;
use crate::params::GroupParameters;
use crate::types::{AggregatedResult, Ciphertext};
use crate::utils::{mod_exp, mod_inverse_prime};

/// Decode one candidate's aggregated ciphertext to its vote count
///
/// Returns the unique `m` in `[0, bound)` with `g^m = c2 / c1^x (mod p)`.
///
/// # Errors
///
/// * `Range` if `c1_sum`/`c2_sum` are not in `[0, p)` or `bound` is invalid; raised
///   before any search work.
/// * `DiscreteLogNotFound` if no such `m` exists, e.g. under a wrong private key or when
///   more votes were cast than `bound` allows.
pub fn decrypt_tally(
    c1_sum: &BigUint,
    c2_sum: &BigUint,
    private_key: &PrivateKey,
    params: &GroupParameters,
    bound: u64,
) -> Result<u64> {
    let decoder = TallyDecoder::new(params.clone(), bound)?;
    decoder.decrypt(&Ciphertext::new(c1_sum.clone(), c2_sum.clone()), private_key)
}

/// Baby-step/giant-step solver for `g^m` with `m` in `[0, bound)`
///
/// Immutable after construction, so one table can serve every candidate concurrently.
#[derive(Clone, Debug)]
pub struct TallyDecoder {
    params: GroupParameters,
    bound: u64,
    /// Baby/giant step width, `ceil(sqrt(bound))`
    step: u64,
    /// g^j mod p -> j for j in [0, step)
    baby_steps: HashMap<BigUint, u64>,
    /// (g^step)^-1 mod p
    giant_factor: BigUint,
}

impl TallyDecoder {
    /// Precompute the baby-step table for `bound`
    ///
    /// Fails `Range` unless `bound` passes [`GroupParameters::check_bound`] and the
    /// generator's order exceeds `bound`; otherwise distinct tallies would share a
    /// ciphertext exponent.
    pub fn new(params: GroupParameters, bound: u64) -> Result<Self> {
        params.check_bound(bound)?;

        let step = ceil_sqrt(bound);
        let p = params.modulus();
        let g = params.generator();

        let mut baby_steps = HashMap::with_capacity(step as usize);
        let mut current = BigUint::one();
        for j in 0..step {
            if j > 0 && current.is_one() {
                return Err(order_too_small(j, bound));
            }
            baby_steps.insert(current.clone(), j);
            current = (&current * g) % p;
        }

        let g_step = mod_exp(g, &BigUint::from(step), p);
        let giant_factor = mod_inverse_prime(&g_step, p);

        debug!(
            "Built baby-step table of {} entries for tally bound {}",
            baby_steps.len(),
            bound
        );

        let decoder = TallyDecoder {
            params,
            bound,
            step,
            baby_steps,
            giant_factor,
        };
        decoder.check_generator_order()?;
        Ok(decoder)
    }

    pub fn params(&self) -> &GroupParameters {
        &self.params
    }

    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Decrypt one aggregated ciphertext and recover its exponent
    pub fn decrypt(&self, ciphertext: &Ciphertext, private_key: &PrivateKey) -> Result<u64> {
        ciphertext.check_range(&self.params)?;

        let p = self.params.modulus();

        // s = c1^x, the shared secret y^r
        let s = mod_exp(&ciphertext.c1, &private_key.x, p);
        let s_inv = mod_inverse_prime(&s, p);

        // g^m = c2 * s^-1
        let g_m = (&ciphertext.c2 * s_inv) % p;
        self.solve_discrete_log(&g_m)
    }

    /// Decode every candidate of a ledger result in parallel
    ///
    /// One `Result` per candidate, index-aligned; a failed slot does not hide the others.
    pub fn decrypt_results(
        &self,
        aggregated: &AggregatedResult,
        private_key: &PrivateKey,
    ) -> Vec<Result<u64>> {
        aggregated
            .par_iter()
            .enumerate()
            .map(|(index, ciphertext)| {
                self.decrypt(ciphertext, private_key).map_err(|err| {
                    warn!("Failed to decode tally for candidate {}: {}", index, err);
                    err
                })
            })
            .collect()
    }

    /// Solve `g^m = value` for `m` in `[0, bound)`
    pub fn solve_discrete_log(&self, value: &BigUint) -> Result<u64> {
        let p = self.params.modulus();
        let mut gamma = value.clone();

        for q in 0..self.step {
            if let Some(&j) = self.baby_steps.get(&gamma) {
                let m = q * self.step + j;
                if m < self.bound {
                    return Ok(m);
                }
                break;
            }
            gamma = (&gamma * &self.giant_factor) % p;
        }

        Err(TallyError::DiscreteLogNotFound { bound: self.bound })
    }

    /// Giant-step search for `g^m = 1` with `m` in `[step, bound)`
    ///
    /// The baby-step table already rules out an order below `step`.
    fn check_generator_order(&self) -> Result<()> {
        let p = self.params.modulus();
        let mut gamma = self.giant_factor.clone();

        for q in 1..self.step {
            if let Some(&j) = self.baby_steps.get(&gamma) {
                let order = q * self.step + j;
                if order < self.bound {
                    return Err(order_too_small(order, self.bound));
                }
                break;
            }
            gamma = (&gamma * &self.giant_factor) % p;
        }
        Ok(())
    }
}

fn order_too_small(order: u64, bound: u64) -> TallyError {
    TallyError::Range(format!(
        "generator order {} does not exceed tally bound {}",
        order, bound
    ))
}

/// Smallest n with n * n >= value
fn ceil_sqrt(value: u64) -> u64 {
    let root = value.sqrt();
    if root * root < value {
        root + 1
    } else {
        root
    }
}
