//! Modular arithmetic and randomness helpers

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{thread_rng, CryptoRng, RngCore};

use crate::error::{Result, TallyError};

/// Modular exponentiation: base^exp mod modulus
pub fn mod_exp(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// Modular inverse modulo a prime, by Fermat's little theorem: a^(p-2) mod p
///
/// Returns zero when `a` is a multiple of `p`; callers treat that as "no inverse".
pub fn mod_inverse_prime(a: &BigUint, p: &BigUint) -> BigUint {
    let exponent = p - 2u32;
    mod_exp(a, &exponent, p)
}

/// Parse a decimal string into a `BigUint`
pub fn parse_decimal(s: &str) -> Option<BigUint> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    BigUint::parse_bytes(trimmed.as_bytes(), 10)
}

/// Draw a uniform element of the inclusive range `[low, high]` from a CSPRNG
pub fn random_in_range_with<R>(rng: &mut R, low: &BigUint, high: &BigUint) -> Result<BigUint>
where
    R: RngCore + CryptoRng,
{
    if low > high {
        return Err(TallyError::Range(format!(
            "empty sampling range [{}, {}]",
            low, high
        )));
    }
    let upper = high + 1u32;
    Ok(rng.gen_biguint_range(low, &upper))
}

/// Same as [`random_in_range_with`], using the thread-local CSPRNG
pub fn random_in_range(low: &BigUint, high: &BigUint) -> Result<BigUint> {
    random_in_range_with(&mut thread_rng(), low, high)
}

/// Miller-Rabin primality test
pub fn is_probable_prime(n: &BigUint, k: usize) -> bool {
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);

    if n <= &BigUint::one() {
        return false;
    }
    if n == &two || n == &three {
        return true;
    }
    if n.is_even() {
        return false;
    }

    let mut rng = thread_rng();
    let n_minus_1 = n - BigUint::one();
    let (s, d) = factor_powers_of_two(&n_minus_1);

    'witness: for _ in 0..k {
        // n >= 5 here, so [2, n-1) is never empty
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = mod_exp(&a, &d, n);

        if x == BigUint::one() || x == n_minus_1 {
            continue;
        }

        for _ in 0..s - 1 {
            x = mod_exp(&x, &two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Factor out powers of 2 from n
pub fn factor_powers_of_two(n: &BigUint) -> (u64, BigUint) {
    let mut s = 0;
    let mut d = n.clone();

    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    (s, d)
}
