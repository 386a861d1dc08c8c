//! Best-effort zeroization for the scalar shares each party holds (`p_i`,
//! `q_i`, `d_i`, and the Shamir/BGW polynomial coefficients derived from
//! them).
//!
//! `num-bigint-dig`'s `BigUint`/`BigInt` don't implement `Zeroize` directly
//! (their backing limb vector isn't exposed to callers), so this crate keeps
//! secret scalars as a sign/magnitude byte buffer that *does* implement it,
//! and wraps that in [`secrecy::SecretBox`] the way the teacher wraps
//! `paillier_sk`/`el_gamal_sk` in `KeyShareSecret`. This is hygiene against
//! accidental retention in memory dumps, not a side-channel guarantee —
//! side-channel-hardened arithmetic is an explicit non-goal.

use num_bigint_dig::{BigInt, Sign};
use secrecy::{ExposeSecret, SecretBox};
use zeroize::Zeroize;

#[derive(Clone, Zeroize)]
pub struct SecretScalar {
    magnitude: Vec<u8>,
    negative: bool,
}

impl SecretScalar {
    pub fn from_bigint(value: &BigInt) -> Self {
        let negative = value.sign() == Sign::Minus;
        let magnitude = value.to_bytes_be().1;
        Self { magnitude, negative }
    }

    pub fn to_bigint(&self) -> BigInt {
        let sign = if self.magnitude.is_empty() {
            Sign::NoSign
        } else if self.negative {
            Sign::Minus
        } else {
            Sign::Plus
        };
        BigInt::from_bytes_be(sign, &self.magnitude)
    }
}

/// A boxed, zeroize-on-drop secret scalar.
pub type Secret = SecretBox<SecretScalar>;

pub fn secret_from_bigint(value: &BigInt) -> Secret {
    SecretBox::new(Box::new(SecretScalar::from_bigint(value)))
}

pub fn expose_as_bigint(secret: &Secret) -> BigInt {
    secret.expose_secret().to_bigint()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_negative_and_positive() {
        for v in [BigInt::from(-12345), BigInt::from(0), BigInt::from(98765)] {
            let s = secret_from_bigint(&v);
            assert_eq!(expose_as_bigint(&s), v);
        }
    }
}
