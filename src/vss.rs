//! Verifiable Secret Sharing / Dealing (`spec.md` §4.E): every party Shamir-
//! shares its `d_i` over `Z_M` with Feldman commitments, so receivers can
//! check the share they were sent against a public commitment without
//! learning the dealer's polynomial.

use num_bigint_dig::{BigInt, BigUint};
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

use crate::arithmetic::{canonical_mod, powmod, random_below};
use crate::error::ThresholdRsaError;
use crate::party::PartyId;

/// The public result of one dealing round: every party's Shamir share of
/// every dealer's secret, plus every dealer's Feldman commitment table.
/// `received_shares[dealer][receiver]` is `f_dealer(receiver + 1)`;
/// `commitments[dealer][t]` is `b_{dealer,t} = g^{a_{dealer,t}} mod N`.
pub struct DealingOutput {
    pub received_shares: Vec<Vec<BigInt>>,
    pub commitments: Vec<Vec<BigUint>>,
}

fn eval_poly(coeffs: &[BigInt], x: i64, modulus: &BigUint) -> BigInt {
    let x_big = BigInt::from(x);
    let mut power = BigInt::one();
    let mut value = BigInt::zero();
    for coeff in coeffs {
        value += coeff * &power;
        power *= &x_big;
    }
    BigInt::from(canonical_mod(&value, modulus))
}

/// Runs dealing phases 1 and 2 for every party at once (`spec.md` §4.E):
/// each party `i` picks a degree `k-1` polynomial over `Z_M` with constant
/// term `d_i`, every other party's share and every commitment table is
/// computed, and every `(dealer, receiver)` share is checked against the
/// dealer's commitments before anything is returned. The first mismatch
/// aborts with the offending dealer named (error taxonomy item 2).
pub fn deal_and_verify<R: Rng + CryptoRng>(
    n_parties: usize,
    threshold: usize,
    modulus_n: &BigUint,
    sharing_prime: &BigUint,
    g: &BigUint,
    d_shares: &[BigInt],
    rng: &mut R,
) -> Result<DealingOutput, ThresholdRsaError> {
    let n = n_parties;
    let k = threshold;

    let mut polynomials: Vec<Vec<BigInt>> = Vec::with_capacity(n);
    for dealer in 0..n {
        let mut coeffs = Vec::with_capacity(k);
        coeffs.push(d_shares[dealer].clone());
        coeffs.extend((1..k).map(|_| BigInt::from(random_below(rng, sharing_prime))));
        polynomials.push(coeffs);
    }

    let mut received_shares = vec![vec![BigInt::zero(); n]; n];
    let mut commitments = vec![Vec::with_capacity(k); n];
    for dealer in 0..n {
        for receiver in 0..n {
            let x = receiver as i64 + 1;
            received_shares[dealer][receiver] = eval_poly(&polynomials[dealer], x, sharing_prime);
        }
        commitments[dealer] = polynomials[dealer]
            .iter()
            .map(|a_t| powmod(g, a_t, modulus_n))
            .collect();
    }

    for dealer in 0..n {
        for receiver in 0..n {
            if !verify_share(
                &received_shares[dealer][receiver],
                receiver,
                &commitments[dealer],
                g,
                modulus_n,
            ) {
                return Err(ThresholdRsaError::DealerMisbehavior { dealer: PartyId(dealer as u32) });
            }
        }
    }

    Ok(DealingOutput { received_shares, commitments })
}

/// Checks `g^{f_{dealer,receiver}} == Π_t b_{dealer,t}^{(receiver+1)^t} (mod
/// N)` (`spec.md` §4.E / testable property in §8).
pub fn verify_share(
    share: &BigInt,
    receiver: usize,
    commitments: &[BigUint],
    g: &BigUint,
    modulus_n: &BigUint,
) -> bool {
    let lhs = powmod(g, share, modulus_n);

    let x = BigInt::from(receiver as i64 + 1);
    let mut x_pow = BigInt::one();
    let mut rhs = BigUint::one();
    for commitment in commitments {
        let term = powmod(commitment, &x_pow, modulus_n);
        rhs = (&rhs * &term) % modulus_n;
        x_pow *= &x;
    }
    lhs == rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn honest_dealing_round_verifies_for_every_pair() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let modulus_n = BigUint::from(1_000_003u32 * 1_000_033u32);
        let sharing_prime = BigUint::from(99_991u32);
        let g = BigUint::from(5u32);
        let n = 4;
        let k = 3;
        let d_shares: Vec<BigInt> = (0..n).map(|i| BigInt::from(10 * (i as i64 + 1))).collect();

        let output = deal_and_verify(n, k, &modulus_n, &sharing_prime, &g, &d_shares, &mut rng).unwrap();
        for dealer in 0..n {
            for receiver in 0..n {
                assert!(verify_share(
                    &output.received_shares[dealer][receiver],
                    receiver,
                    &output.commitments[dealer],
                    &g,
                    &modulus_n,
                ));
            }
        }
    }

    #[test]
    fn tampered_commitment_is_detected() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let modulus_n = BigUint::from(1_000_003u32 * 1_000_033u32);
        let sharing_prime = BigUint::from(99_991u32);
        let g = BigUint::from(5u32);
        let n = 3;
        let k = 2;
        let d_shares: Vec<BigInt> = vec![BigInt::from(7), BigInt::from(11), BigInt::from(13)];

        let mut output = deal_and_verify(n, k, &modulus_n, &sharing_prime, &g, &d_shares, &mut rng).unwrap();
        output.commitments[1][0] = (&output.commitments[1][0] + BigUint::from(1u32)) % &modulus_n;

        assert!(!verify_share(
            &output.received_shares[1][0],
            0,
            &output.commitments[1],
            &g,
            &modulus_n,
        ));
    }
}
