//! Signature Share Generation, Proof, Verification, Combine (`spec.md`
//! §4.G). Shared verbatim by real signing and by the dummy-message rehearsal
//! `crate::presign` runs to recover `x_I` — both are "sign `message` with
//! exponent `alpha`", just with a different `message` and a different
//! source for `alpha`.
//!
//! The source leaves the proof's challenge `c` random, which the source
//! itself flags as unsound (a simulator could forge a proof for any
//! transcript). This implementation derives `c` via a Fiat-Shamir hash over
//! the transcript instead, the way `XofHasher` in the teacher crate derives
//! non-interactive sigma-protocol challenges from `sha3::Shake256`.

use num_bigint_dig::{BigInt, BigUint, Sign};
use num_traits::One;
use rand::{CryptoRng, Rng};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::arithmetic::{powmod, random_below};
use crate::party::{PartyId, SignatureShare, SignatureShareProof};

const CHALLENGE_BYTES: usize = 32;

/// `H(g, N, g^s, m^s, b_{i,0}*h_i, c_i, id)`, the Fiat-Shamir replacement
/// for the source's random challenge.
fn fiat_shamir_challenge(
    g: &BigUint,
    modulus_n: &BigUint,
    g_s: &BigUint,
    m_s: &BigUint,
    public_point: &BigUint,
    c_i: &BigUint,
    id: PartyId,
) -> BigInt {
    let mut hasher = Shake256::default();
    for value in [g, modulus_n, g_s, m_s, public_point, c_i] {
        Update::update(&mut hasher, &value.to_bytes_be());
    }
    Update::update(&mut hasher, &id.0.to_be_bytes());

    let mut reader = hasher.finalize_xof();
    let mut challenge_bytes = [0u8; CHALLENGE_BYTES];
    reader.read(&mut challenge_bytes);
    BigInt::from_bytes_be(Sign::Plus, &challenge_bytes)
}

/// Produces a signature share on `message` for exponent `alpha` (either
/// `d_i` alone is never used directly — always `s_i + d_i`, the quantity
/// `crate::presign` and real signing both operate on), together with its
/// Chaum-Pedersen-style proof of knowledge of `alpha` (`spec.md` §4.G steps
/// 1-2).
///
/// `public_point` is `b_{i,0} * h_i mod N`, the public value whose discrete
/// log (base `g`) is `alpha`.
pub fn generate_signature_share<R: Rng + CryptoRng>(
    id: PartyId,
    message: &BigUint,
    alpha: &BigInt,
    public_point: &BigUint,
    g: &BigUint,
    modulus_n: &BigUint,
    rng: &mut R,
) -> SignatureShare {
    let c_i = powmod(message, alpha, modulus_n);

    let s = random_below(rng, modulus_n);
    let s_signed = BigInt::from(s);
    let g_s = powmod(g, &s_signed, modulus_n);
    let m_s = powmod(message, &s_signed, modulus_n);

    let c = fiat_shamir_challenge(g, modulus_n, &g_s, &m_s, public_point, &c_i, id);
    let r = &s_signed + &c * alpha;

    SignatureShare {
        c_i,
        proof: SignatureShareProof { m: message.clone(), g_s, m_s, r, c, id },
    }
}

/// Verifies a signature share's proof against the claimed public point
/// `b_{j,0} * h_j mod N` (`spec.md` §4.G step 3): recomputes the Fiat-Shamir
/// challenge from the transcript (so a party cannot just invent a
/// favorable `c`) and checks both verification equations.
pub fn verify_signature_share(share: &SignatureShare, public_point: &BigUint, g: &BigUint, modulus_n: &BigUint) -> bool {
    let proof = &share.proof;

    let expected_c = fiat_shamir_challenge(g, modulus_n, &proof.g_s, &proof.m_s, public_point, &share.c_i, proof.id);
    if expected_c != proof.c {
        return false;
    }

    let lhs_g = powmod(g, &proof.r, modulus_n);
    let rhs_g = (&proof.g_s * &powmod(public_point, &proof.c, modulus_n)) % modulus_n;
    if lhs_g != rhs_g {
        return false;
    }

    let lhs_m = powmod(&proof.m, &proof.r, modulus_n);
    let rhs_m = (&proof.m_s * &powmod(&share.c_i, &proof.c, modulus_n)) % modulus_n;
    lhs_m == rhs_m
}

/// Combines verified signature shares into the final signature (`spec.md`
/// §4.G step 4): `(Π c_i) * m^{-x_I * M} mod N`.
pub fn combine_signature_shares(
    shares: &[BigUint],
    x_i: i64,
    sharing_prime: &BigUint,
    message: &BigUint,
    modulus_n: &BigUint,
) -> BigUint {
    let product = shares.iter().fold(BigUint::one(), |acc, c| (acc * c) % modulus_n);
    let correction_exponent = -(BigInt::from(x_i) * BigInt::from(sharing_prime.clone()));
    let correction = powmod(message, &correction_exponent, modulus_n);
    (product * correction) % modulus_n
}
