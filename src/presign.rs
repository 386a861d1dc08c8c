//! Subset Presigning (`spec.md` §4.F): for a chosen agreeing subset `I` of
//! size `k`, converts each member's additive share of `Σ_{j not in I} d_j`
//! into a signature-ready exponent `s_i`, then rehearses a dummy signature
//! to recover the small integer correction `x_I` that real signing needs
//! (`spec.md` §3 invariant 5). Cached per subset by the caller
//! (`crate::network`) — this module always runs all of phases 0-4 and
//! returns fresh state; it does not itself track what has already run.

use std::collections::HashMap;

use num_bigint_dig::{BigInt, BigUint};
use num_traits::One;
use rand::{CryptoRng, Rng};

use crate::arithmetic::{canonical_mod, mod_inverse_signed, powmod};
use crate::config::ProtocolParams;
use crate::error::ThresholdRsaError;
use crate::party::{PartyId, PresigningArtifact, PresigningData, SignatureShare, Subset};
use crate::secret::secret_from_bigint;
use crate::sign::{generate_signature_share, verify_signature_share};

/// Lagrange-at-zero coefficient for party `id` within subset `members`
/// (`spec.md` §4.F phase 1): `Π_{j in I\{id}} (j+1)*(j-id)^{-1} mod M`.
fn lagrange_at_zero_in_subset(id: usize, members: &[usize], modulus: &BigUint) -> BigUint {
    let mut product = BigInt::one();
    for &j in members {
        if j == id {
            continue;
        }
        let numerator = BigInt::from(j as i64 + 1);
        let denominator = BigInt::from(j as i64 - id as i64);
        let inverse = mod_inverse_signed(&denominator, modulus)
            .expect("distinct subset members are invertible mod the sharing prime M");
        product = BigInt::from(canonical_mod(&(&product * &numerator * BigInt::from(inverse)), modulus));
    }
    canonical_mod(&product, modulus)
}

/// One member's independent phase-3 exhaustive search for `x_I` (`spec.md`
/// §4.F phase 3): the product of every member's dummy signature share must
/// equal `2 * base^x mod N` for exactly one `x` in `[lo, hi]`. Each member
/// calls this against its own view of the broadcast `dummy_shares`, and the
/// results are then compared for unanimity by the caller.
fn recover_x_i(
    members: &[usize],
    dummy_shares: &HashMap<usize, SignatureShare>,
    modulus_n: &BigUint,
    base: &BigUint,
    lo: i64,
    hi: i64,
) -> Result<i64, ThresholdRsaError> {
    let product = members
        .iter()
        .fold(BigUint::one(), |acc, i| (acc * &dummy_shares[i].c_i) % modulus_n);
    let two = BigUint::from(2u32);

    for x in lo..=hi {
        let candidate = (&two * powmod(base, &BigInt::from(x), modulus_n)) % modulus_n;
        if candidate == product {
            return Ok(x);
        }
    }
    Err(ThresholdRsaError::ArithmeticPrecondition(format!(
        "no x_I in [{lo}, {hi}] reconciles the dummy signature; earlier corruption"
    )))
}

/// Runs subset presigning phases 0-4 for every member of `subset` and
/// returns each member's filled-in [`PresigningData`].
///
/// `received_shares[dealer][receiver]` and `commitments[dealer]` are the
/// outputs of `crate::vss::deal_and_verify`. `d_shares[i]` is party `i`'s
/// share of the private exponent.
pub fn run_subset_presigning<P: ProtocolParams, R: Rng + CryptoRng>(
    subset: &Subset,
    n_parties: usize,
    modulus_n: &BigUint,
    sharing_prime: &BigUint,
    g: &BigUint,
    commitments: &[Vec<BigUint>],
    received_shares: &[Vec<BigInt>],
    d_shares: &[BigInt],
    rng: &mut R,
) -> Result<HashMap<PartyId, PresigningData>, ThresholdRsaError> {
    let members: Vec<usize> = subset.iter().map(|id| id.index()).collect();
    let k = members.len();
    let complement: Vec<PartyId> = subset.complement(n_parties as u32);

    // Phase 0: the fixed dummy ciphertext. m* = 2^e mod N is public; signing
    // it with the true d recovers 2 exactly (m*^d = (2^e)^d = 2 mod N), which
    // is what lets phase 3 read x_I off the combined dummy share.
    let m_star = powmod(&BigUint::from(2u32), &BigInt::from(P::E), modulus_n);

    // Phase 1: s_i = lambda_i * Sum_{j not in I} f_{j,i} mod M; h_i = g^{s_i}.
    let mut lambda = HashMap::new();
    let mut s = HashMap::new();
    let mut h = HashMap::new();
    for &i in &members {
        let lambda_i = lagrange_at_zero_in_subset(i, &members, sharing_prime);
        let sum_outside: BigInt = complement.iter().map(|j| received_shares[j.index()][i].clone()).sum();
        let s_i = canonical_mod(&(BigInt::from(lambda_i.clone()) * &sum_outside), sharing_prime);
        let h_i = powmod(g, &BigInt::from(s_i.clone()), modulus_n);
        lambda.insert(i, lambda_i);
        s.insert(i, s_i);
        h.insert(i, h_i);
    }

    // Phase 2: sign the dummy message with exponent s_i + d_i.
    let mut dummy_shares = HashMap::new();
    for &i in &members {
        let alpha = BigInt::from(s[&i].clone()) + &d_shares[i];
        let public_point = (&commitments[i][0] * &h[&i]) % modulus_n;
        let share = generate_signature_share(PartyId(i as u32), &m_star, &alpha, &public_point, g, modulus_n, rng);
        dummy_shares.insert(i, share);
    }

    // Phase 3: verify every dummy share, then each member independently
    // recovers x_I by its own exhaustive search over [k-n, k] (spec.md
    // §4.F phase 3: "Broadcast x_I; each party verifies unanimity"), the
    // same way vss::deal_and_verify checks every receiver's share against
    // the dealer's commitments independently rather than trusting one
    // shared computation.
    for &i in &members {
        let public_point = (&commitments[i][0] * &h[&i]) % modulus_n;
        if !verify_signature_share(&dummy_shares[&i], &public_point, g, modulus_n) {
            return Err(ThresholdRsaError::InvalidSignatureShare { party: PartyId(i as u32) });
        }
    }

    let base = powmod(&m_star, &BigInt::from(sharing_prime.clone()), modulus_n);
    let lo = k as i64 - n_parties as i64;
    let hi = k as i64;

    let mut x_per_member = HashMap::new();
    for &i in &members {
        let x_i = recover_x_i(&members, &dummy_shares, modulus_n, &base, lo, hi)?;
        x_per_member.insert(i, x_i);
    }

    let reference = members[0];
    let x_i = x_per_member[&reference];
    for &i in &members {
        if x_per_member[&i] != x_i {
            return Err(ThresholdRsaError::InconsistentXI {
                party: PartyId(i as u32),
                ours: x_i,
                theirs: x_per_member[&i],
            });
        }
    }

    // Phase 4: assemble D_I and the per-member PresigningData.
    let artifact = PresigningArtifact {
        x_i,
        dummy_shares: members
            .iter()
            .map(|i| (PartyId(*i as u32), h[i].clone(), dummy_shares[i].clone()))
            .collect(),
    };

    let mut out = HashMap::new();
    for &i in &members {
        let mut data = PresigningData::new(lambda[&i].clone(), secret_from_bigint(&BigInt::from(s[&i].clone())), h[&i].clone());
        data.received_h = h.iter().map(|(j, v)| (PartyId(*j as u32), v.clone())).collect();
        data.received_dummy_shares = dummy_shares.iter().map(|(j, v)| (PartyId(*j as u32), v.clone())).collect();
        data.x_i = Some(x_i);
        data.artifact = Some(artifact.clone());
        out.insert(PartyId(i as u32), data);
    }
    Ok(out)
}
