//! Arithmetic Facade (`spec.md` §4.A).
//!
//! A thin, named wrapper around `num-bigint-dig`'s arbitrary-precision
//! `BigUint`/`BigInt`. The rest of the crate never reaches for
//! `num-bigint-dig` directly — every modular operation the protocol needs
//! goes through here, the same way `synedrion`'s `uint` module is the sole
//! place that touches `crypto-bigint`.

use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::{BigInt, BigUint, ExtendedGcd, ModInverse, RandBigInt, RandPrime, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

/// Number of Miller-Rabin rounds used when we can't rely on
/// `num-bigint-dig`'s own default (it already picks a safe round count
/// internally for `probably_prime`/`find_prime`, but we spell it out at call
/// sites that do their own search loop).
const MILLER_RABIN_ROUNDS: usize = 32;

/// `x mod m`, always in `[0, m)` — mirrors `helpers.py:mod`'s explicit
/// correction for `gmpy2.t_mod`'s possibly-negative result.
pub fn canonical_mod(x: &BigInt, m: &BigUint) -> BigUint {
    let m_signed = BigInt::from(m.clone());
    x.mod_floor(&m_signed)
        .to_biguint()
        .expect("mod_floor against a positive modulus is never negative")
}

/// `(base ^ exponent) mod modulus`, exponent may be negative (mirrors
/// `helpers.py:powmod` built on `gmpy2.powmod`, which accepts negative
/// exponents transparently by inverting).
pub fn powmod(base: &BigUint, exponent: &BigInt, modulus: &BigUint) -> BigUint {
    if exponent.sign() == Sign::Minus {
        let positive_exp = (-exponent)
            .to_biguint()
            .expect("negation of a negative BigInt is non-negative");
        let forward = base.modpow(&positive_exp, modulus);
        mod_inverse_unsigned(&forward, modulus)
            .expect("base must be invertible mod modulus to use a negative exponent")
    } else {
        let exp = exponent
            .to_biguint()
            .expect("non-negative BigInt converts to BigUint");
        base.modpow(&exp, modulus)
    }
}

/// Modular inverse of `x` modulo a (not necessarily prime) `modulus`, via
/// the extended Euclidean algorithm. `None` iff `gcd(x, modulus) != 1`.
pub fn mod_inverse_unsigned(x: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    let x_signed = BigInt::from(x.clone());
    x_signed
        .mod_inverse(BigInt::from(modulus.clone()))
        .map(|inv| canonical_mod(&inv, modulus))
}

/// Modular inverse of a signed value.
pub fn mod_inverse_signed(x: &BigInt, modulus: &BigUint) -> Option<BigUint> {
    x.clone()
        .mod_inverse(BigInt::from(modulus.clone()))
        .map(|inv| canonical_mod(&inv, modulus))
}

/// Fast-path modular inverse when `modulus` is known prime: `x^(modulus-2)`.
pub fn mod_inverse_prime(x: &BigUint, prime_modulus: &BigUint) -> BigUint {
    let exponent = BigInt::from(prime_modulus - 2u32);
    powmod(x, &exponent, prime_modulus)
}

/// `gcd(a, b)`.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}

/// A uniform random integer in `[0, n)`.
pub fn random_below<R: Rng + CryptoRng>(rng: &mut R, n: &BigUint) -> BigUint {
    rng.gen_biguint_below(n)
}

/// A uniform random integer in `[lo, hi)`.
pub fn random_range<R: Rng + CryptoRng>(rng: &mut R, lo: &BigUint, hi: &BigUint) -> BigUint {
    rng.gen_biguint_range(lo, hi)
}

/// A random prime in `[start, end)`: sample uniformly, then walk forward
/// (skipping even candidates) until a probable prime is found. Mirrors
/// `helpers.py:get_random_prime`.
pub fn random_prime<R: Rng + CryptoRng>(rng: &mut R, start: &BigUint, end: &BigUint) -> BigUint {
    let mut candidate = random_range(rng, start, end);
    if candidate.is_even() && !candidate.is_zero() {
        candidate += 1u32;
    }
    loop {
        if probably_prime(&candidate, MILLER_RABIN_ROUNDS) {
            return candidate;
        }
        candidate += 2u32;
        if &candidate >= end {
            candidate = start.clone();
        }
    }
}

/// A random safe prime (`p` prime and `(p-1)/2` prime) in `[start, end)`.
/// Mirrors `helpers.py:get_random_safe_prime`.
pub fn random_safe_prime<R: Rng + CryptoRng>(rng: &mut R, start: &BigUint, end: &BigUint) -> BigUint {
    loop {
        let candidate = random_prime(rng, start, end);
        let half = (&candidate - BigUint::one()) / BigUint::from(2u32);
        if probably_prime(&half, MILLER_RABIN_ROUNDS) {
            return candidate;
        }
    }
}

/// Produces `bits`-wide random primes directly (used where we don't need an
/// explicit `[start, end)` window, only a bit length), via
/// `num-bigint-dig`'s own generator.
pub fn random_prime_bits<R: Rng + CryptoRng>(rng: &mut R, bits: usize) -> BigUint {
    rng.gen_prime(bits)
}

/// All primes in `(lo, hi]`, via a sieve of Eratosthenes over native `u64`.
/// `B1`/`B2` (`spec.md` §6) are small enough (2^15, 2^19) that this never
/// needs arbitrary precision.
pub fn primes_in_range(lo: u64, hi: u64) -> Vec<u64> {
    if hi < 2 {
        return Vec::new();
    }
    let mut sieve = vec![true; (hi + 1) as usize];
    sieve[0] = false;
    if hi >= 1 {
        sieve[1] = false;
    }
    let mut i = 2u64;
    while i * i <= hi {
        if sieve[i as usize] {
            let mut j = i * i;
            while j <= hi {
                sieve[j as usize] = false;
                j += i;
            }
        }
        i += 1;
    }
    (lo.max(2)..=hi)
        .filter(|&n| sieve[n as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn canonical_mod_is_never_negative() {
        let m = BigUint::from(17u32);
        let x = BigInt::from(-5);
        assert_eq!(canonical_mod(&x, &m), BigUint::from(12u32));
    }

    #[test]
    fn powmod_handles_negative_exponent() {
        let modulus = BigUint::from(101u32); // prime
        let base = BigUint::from(7u32);
        let positive = powmod(&base, &BigInt::from(3), &modulus);
        let via_negative = powmod(&positive, &BigInt::from(-1), &modulus);
        assert_eq!(via_negative, base);
    }

    #[test]
    fn mod_inverse_round_trips() {
        let modulus = BigUint::from(97u32);
        let x = BigUint::from(13u32);
        let inv = mod_inverse_unsigned(&x, &modulus).unwrap();
        assert_eq!((x * inv) % modulus, BigUint::one());
    }

    #[test]
    fn primes_in_range_matches_known_values() {
        let primes = primes_in_range(0, 30);
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn random_prime_is_prime() {
        let mut r = rng();
        let start = BigUint::from(1000u32);
        let end = BigUint::from(2000u32);
        let p = random_prime(&mut r, &start, &end);
        assert!(probably_prime(&p, 32));
    }
}
