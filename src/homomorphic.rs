//! Reference homomorphic aggregation
//!
//! Aggregation belongs to the ledger: it multiplies same-index ciphertext components
//! mod `p`, turning per-voter encryptions of `m_i` into one encryption of `sum(m_i)`.
//! These helpers give ledger implementers, demos and tests the exact arithmetic.

use log::debug;

use crate::error::{Result, TallyError};
use crate::params::GroupParameters;
use crate::types::{AggregatedResult, Ciphertext, VoteVector};

/// Homomorphic addition of exponentially encrypted values
pub trait HomomorphicOperations {
    /// Combine two ciphertexts: `Enc(a) * Enc(b) = Enc(a + b)`
    fn homomorphic_add(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext>;

    /// Combine any number of ciphertexts; the empty sum is the identity ciphertext
    fn homomorphic_sum(&self, ciphertexts: &[Ciphertext]) -> Result<Ciphertext>;

    /// Combine ballots candidate by candidate
    fn aggregate_votes(&self, ballots: &[VoteVector]) -> Result<AggregatedResult>;
}

impl HomomorphicOperations for GroupParameters {
    fn homomorphic_add(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        ct1.check_range(self)?;
        ct2.check_range(self)?;

        let p = self.modulus();
        let c1 = (&ct1.c1 * &ct2.c1) % p;
        let c2 = (&ct1.c2 * &ct2.c2) % p;

        Ok(Ciphertext::new(c1, c2))
    }

    fn homomorphic_sum(&self, ciphertexts: &[Ciphertext]) -> Result<Ciphertext> {
        ciphertexts
            .iter()
            .try_fold(Ciphertext::identity(), |acc, ct| self.homomorphic_add(&acc, ct))
    }

    fn aggregate_votes(&self, ballots: &[VoteVector]) -> Result<AggregatedResult> {
        let candidates = match ballots.first() {
            Some(first) => first.len(),
            None => return Err(TallyError::Range("no ballots to aggregate".to_string())),
        };

        let mut totals = vec![Ciphertext::identity(); candidates];
        for (index, ballot) in ballots.iter().enumerate() {
            if ballot.len() != candidates {
                return Err(TallyError::Range(format!(
                    "ballot {} has {} entries, expected {}",
                    index,
                    ballot.len(),
                    candidates
                )));
            }
            for (total, ct) in totals.iter_mut().zip(ballot) {
                *total = self.homomorphic_add(total, ct)?;
            }
        }

        debug!(
            "Aggregated {} ballots over {} candidates",
            ballots.len(),
            candidates
        );
        Ok(totals)
    }
}
