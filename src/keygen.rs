//! Private-Key Share Generator (`spec.md` §4.D): the `phi(N) mod e` trick,
//! with trial decryption correcting the resulting additive error term.

use num_bigint_dig::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

use crate::arithmetic::{canonical_mod, mod_inverse_unsigned, powmod, random_below};
use crate::config::ProtocolParams;
use crate::error::ThresholdRsaError;

/// Splits `secret` into `n` additive shares mod `modulus` (the same
/// construction as `modulus::split_additive`, reused here at the much
/// smaller modulus `e` for each party's `phi_i` decomposition, `spec.md`
/// §4.D step 2).
fn split_additive_small<R: Rng + CryptoRng>(
    secret: &BigInt,
    n: usize,
    modulus: &BigUint,
    rng: &mut R,
) -> Vec<BigInt> {
    let mut shares: Vec<BigInt> = (0..n - 1).map(|_| BigInt::from(random_below(rng, modulus))).collect();
    let partial: BigInt = shares.iter().cloned().sum();
    let last = canonical_mod(&(secret - &partial), modulus);
    shares.push(BigInt::from(last));
    shares
}

/// Runs all of §4.D and returns every party's additive share of the
/// private exponent `d`. `phi_parity_guard` set to `Err` signals
/// `gcd(phi(N), e) != 1` (the REDESIGN FLAGS resolution for the source's
/// unhandled case): the caller should treat this as a bad modulus and
/// regenerate `N`, the same as a failed biprimality test.
pub fn generate_private_key_shares<P: ProtocolParams, R: Rng + CryptoRng>(
    n_parties: usize,
    modulus_n: &BigUint,
    p_shares: &[BigInt],
    q_shares: &[BigInt],
    rng: &mut R,
) -> Result<Vec<BigInt>, ThresholdRsaError> {
    let n = n_parties;
    let e = BigUint::from(P::E);

    // Step 1: phi_i = -(p_i + q_i); party 0 additionally adds N + 1, so that
    // Sum phi_i == phi(N) exactly (not just mod anything).
    let mut phi: Vec<BigInt> = (0..n).map(|i| -(&p_shares[i] + &q_shares[i])).collect();
    phi[0] += BigInt::from(modulus_n.clone()) + BigInt::one();

    // Step 2 + 3: each phi_i is additively split mod e and "sent" to every
    // party; each party sums its received column and broadcasts that sum;
    // every party then sums the broadcasts to learn psi = phi(N) mod e.
    // (Collapsing the two summation rounds into one pass changes nothing
    // observable here: the orchestrator already holds every phi_i, and
    // summation is associative, so splitting then regrouping is the
    // identity on the final psi. It matters for *why* no single party ever
    // sees another's phi_i in the clear, not for the arithmetic result.)
    let splits: Vec<Vec<BigInt>> = phi.iter().map(|phi_i| split_additive_small(phi_i, n, &e, rng)).collect();
    let column_sums: Vec<BigInt> = (0..n)
        .map(|j| {
            let column: BigInt = splits.iter().map(|row| row[j].clone()).sum();
            BigInt::from(canonical_mod(&column, &e))
        })
        .collect();
    let psi_sum: BigInt = column_sums.iter().cloned().sum();
    let psi = canonical_mod(&psi_sum, &e);

    // Step 4: psi^-1 mod e, existing iff gcd(phi(N), e) == 1.
    let psi_inv = mod_inverse_unsigned(&psi, &e).ok_or_else(|| {
        ThresholdRsaError::ArithmeticPrecondition(format!(
            "gcd(phi(N), e) != 1 (psi = {psi}); N must be regenerated"
        ))
    })?;
    let psi_inv = BigInt::from(psi_inv);
    let e_big = BigInt::from(e.clone());

    // Step 5: d_i = floor(-phi_i * psi^-1 / e); party 0's extra "+1" term
    // accounts for e*d == 1 (mod phi(N)) rather than == 0.
    let mut d: Vec<BigInt> = phi
        .iter()
        .map(|phi_i| (-phi_i * &psi_inv).div_floor(&e_big))
        .collect();
    d[0] = (BigInt::one() - &phi[0] * &psi_inv).div_floor(&e_big);

    // Step 6: trial decryption corrects the additive error term epsilon in
    // [0, n) left over from the floor-division rounding above.
    let message = BigUint::from(P::TRIAL_DECRYPTION_MESSAGE) % modulus_n;
    let per_party_cipher: Vec<BigUint> = d
        .iter()
        .map(|d_i| powmod(&message, &(d_i * &e_big), modulus_n))
        .collect();
    let product = per_party_cipher
        .iter()
        .fold(BigUint::one(), |acc, c| (acc * c) % modulus_n);
    let message_to_e = powmod(&message, &e_big, modulus_n);

    let mut term = BigUint::one();
    let mut epsilon = None;
    for eps in 0..n as u32 {
        let candidate = (&product * &term) % modulus_n;
        if candidate == message {
            epsilon = Some(eps);
            break;
        }
        term = (&term * &message_to_e) % modulus_n;
    }
    let epsilon =
        epsilon.ok_or(ThresholdRsaError::ArithmeticPrecondition(
            "trial decryption found no epsilon in [0, n); earlier corruption".to_string(),
        ))?;
    d[0] += BigInt::from(epsilon);

    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestParams;
    use crate::modulus::generate_modulus_trusted;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn recovered_d_satisfies_e_d_congruent_1_mod_phi_n() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let n_parties = 4;
        let setup = generate_modulus_trusted::<TestParams, _>(n_parties, &mut rng);

        let d_shares =
            generate_private_key_shares::<TestParams, _>(n_parties, &setup.modulus_n, &setup.p_shares, &setup.q_shares, &mut rng)
                .expect("gcd(phi(N), e) == 1 for this fixed small example");

        let p: BigInt = setup.p_shares.iter().cloned().sum();
        let q: BigInt = setup.q_shares.iter().cloned().sum();
        let phi_n = (&p - BigInt::one()) * (&q - BigInt::one());
        let phi_n_u = phi_n.to_biguint().expect("phi(N) is positive for a real modulus");

        let d: BigInt = d_shares.into_iter().sum();
        let lhs = canonical_mod(&(d * BigInt::from(TestParams::E)), &phi_n_u);
        assert_eq!(lhs, BigUint::one());
    }
}
