//! BGW Multiplication Round (`spec.md` §4.B).
//!
//! Turns two additive sharings `{p_i}`, `{q_i}` (mod `M`) into an additive
//! sharing of `p*q mod M`, without any party learning `p`, `q`, or the
//! product. This is the one general-purpose subroutine Component C
//! (`crate::modulus`) calls `n` times per prime plus once more to combine
//! `p` and `q` into `N`.
//!
//! The reference protocol is phrased as three per-party phases over a
//! broadcast channel; since this crate's `Network` (`crate::network`) drives
//! every phase as an in-process barrier (`spec.md` §5), `bgw_multiply` below
//! runs all three phases for every party in one call rather than exposing
//! them as separate message-passing steps — there is nothing for phase 0/1
//! to do that isn't already captured by sampling `BgwRound` and filling the
//! evaluation tables before phase 2 reads them.

use num_bigint_dig::{BigInt, BigUint};
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

use crate::arithmetic::{canonical_mod, mod_inverse_signed, random_below};

/// One party's transient state for a single BGW round: its degree bound and
/// the freshly sampled coefficients for `f_i`, `g_i`, `h_i` (`spec.md` §3).
struct BgwRound {
    modulus: BigUint,
    /// Coefficients of `x^1 .. x^l` for `f_i` (the constant term is `p_i`,
    /// supplied separately at evaluation time).
    a: Vec<BigInt>,
    /// Coefficients of `x^1 .. x^l` for `g_i` (constant term `q_i`).
    b: Vec<BigInt>,
    /// Coefficients of `x^1 .. x^{2l}` for `h_i` (constant term fixed at 0).
    c: Vec<BigInt>,
}

impl BgwRound {
    fn sample<R: Rng + CryptoRng>(modulus: &BigUint, l: usize, rng: &mut R) -> Self {
        let sample_coeffs = |count: usize, rng: &mut R| -> Vec<BigInt> {
            (0..count).map(|_| BigInt::from(random_below(rng, modulus))).collect()
        };
        BgwRound {
            modulus: modulus.clone(),
            a: sample_coeffs(l, rng),
            b: sample_coeffs(l, rng),
            c: sample_coeffs(2 * l, rng),
        }
    }

    fn eval(&self, constant: &BigInt, coeffs: &[BigInt], x: i64) -> BigInt {
        let x_big = BigInt::from(x);
        let mut power = BigInt::one();
        let mut value = constant.clone();
        for coeff in coeffs {
            power *= &x_big;
            value += coeff * &power;
        }
        BigInt::from(canonical_mod(&value, &self.modulus))
    }

    fn eval_f(&self, p_i: &BigInt, x: i64) -> BigInt {
        self.eval(p_i, &self.a, x)
    }

    fn eval_g(&self, q_i: &BigInt, x: i64) -> BigInt {
        self.eval(q_i, &self.b, x)
    }

    fn eval_h(&self, x: i64) -> BigInt {
        self.eval(&BigInt::zero(), &self.c, x)
    }
}

/// The Lagrange-at-zero coefficient for party `id` among points `{1, ..,
/// n}`: `Π_{h≠id} (h+1)*(h-id)^{-1} mod M` (`spec.md` §4.B phase 2).
fn lagrange_at_zero(id: usize, n: usize, modulus: &BigUint) -> BigInt {
    let mut product = BigInt::one();
    for h in 0..n {
        if h == id {
            continue;
        }
        let numerator = BigInt::from(h as i64 + 1);
        let denominator = BigInt::from(h as i64 - id as i64);
        let inverse = mod_inverse_signed(&denominator, modulus)
            .expect("distinct party points are invertible mod the sharing prime M");
        product = BigInt::from(canonical_mod(&(&product * &numerator * BigInt::from(inverse)), modulus));
    }
    product
}

/// Runs one BGW multiplication: given every party's additive share of `p`
/// and `q` (mod `modulus`), returns every party's additive share of `p*q`
/// (mod `modulus`). `p_shares[i]`/`q_shares[i]` is party `i`'s share.
///
/// Requires `n > 2*l` with `l = (n-1)/2` (`spec.md` §4.B rationale) — true
/// for every `n >= 1` by construction of `l`, so this never fails on size
/// grounds; a degenerate single-party "network" (`n == 1`) runs with `l ==
/// 0`, i.e. no re-randomization at all.
pub fn bgw_multiply<R: Rng + CryptoRng>(
    modulus: &BigUint,
    p_shares: &[BigInt],
    q_shares: &[BigInt],
    rng: &mut R,
) -> Vec<BigInt> {
    assert_eq!(p_shares.len(), q_shares.len(), "share vectors must be the same length");
    let n = p_shares.len();
    let l = n.saturating_sub(1) / 2;

    // Phase 0 + 1: every party samples its round state and evaluates its
    // three polynomials at every other party's point `j+1`.
    let rounds: Vec<BgwRound> = (0..n).map(|_| BgwRound::sample(modulus, l, rng)).collect();

    let mut f_table = vec![vec![BigInt::zero(); n]; n]; // f_table[sender][receiver]
    let mut g_table = vec![vec![BigInt::zero(); n]; n];
    let mut h_table = vec![vec![BigInt::zero(); n]; n];
    for sender in 0..n {
        for receiver in 0..n {
            let x = receiver as i64 + 1;
            f_table[sender][receiver] = rounds[sender].eval_f(&p_shares[sender], x);
            g_table[sender][receiver] = rounds[sender].eval_g(&q_shares[sender], x);
            h_table[sender][receiver] = rounds[sender].eval_h(x);
        }
    }

    // Phase 2: each party sums its received column, forms the degree-2l
    // evaluation N_id = F*G + H, then applies the fixed Lagrange-at-zero
    // coefficient to recover its own additive share of p*q.
    (0..n)
        .map(|id| {
            let f_sum: BigInt = (0..n).map(|sender| f_table[sender][id].clone()).sum();
            let g_sum: BigInt = (0..n).map(|sender| g_table[sender][id].clone()).sum();
            let h_sum: BigInt = (0..n).map(|sender| h_table[sender][id].clone()).sum();
            let n_id = BigInt::from(canonical_mod(&(&f_sum * &g_sum + &h_sum), modulus));
            let lambda = lagrange_at_zero(id, n, modulus);
            BigInt::from(canonical_mod(&(&n_id * &lambda), modulus))
        })
        .collect()
}
