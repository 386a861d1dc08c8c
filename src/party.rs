//! Data model (`spec.md` §3): `Party`, `Subset`, `PresigningData`,
//! `SignatureShare`, and the small `PartyId` newtype that threads through
//! every component. There is exactly one kind of party in this protocol, so
//! — per the design note in `spec.md` §9 warning against an inheritance
//! hierarchy — `Party` is a plain struct with inherent methods, not a trait
//! object; compare `synedrion`'s `PartyIdx` over `u32` in
//! `synedrion/src/protocols/common.rs`.

use std::collections::HashMap;
use std::fmt;

use num_bigint_dig::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

/// A party index in `{0, ..., n-1}`. The only asymmetry between parties
/// (`spec.md` §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(pub u32);

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PartyId {
    fn from(value: u32) -> Self {
        PartyId(value)
    }
}

impl PartyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An ordered sequence of `k` agreeing party ids (`spec.md` §3, §9: "a
/// hashable tuple of ids, not pointer/identity"). Used to key the
/// presigning cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subset(Vec<PartyId>);

impl Subset {
    pub fn new(mut ids: Vec<PartyId>) -> Self {
        ids.dedup();
        Subset(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: PartyId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartyId> {
        self.0.iter()
    }

    /// The complement `I' = parties \ I` within `{0, ..., n_parties-1}`.
    pub fn complement(&self, n_parties: u32) -> Vec<PartyId> {
        (0..n_parties)
            .map(PartyId)
            .filter(|id| !self.contains(*id))
            .collect()
    }
}

/// The Schnorr-style ZK proof component of a [`SignatureShare`]:
/// `(m, (g^s, m^s), c_i, r, c, id)` from `spec.md` §3/§4.G.
#[derive(Debug, Clone)]
pub struct SignatureShareProof {
    pub m: BigUint,
    pub g_s: BigUint,
    pub m_s: BigUint,
    pub r: BigInt,
    pub c: BigInt,
    pub id: PartyId,
}

/// `(c_i, proof)` — `spec.md` §3.
#[derive(Debug, Clone)]
pub struct SignatureShare {
    pub c_i: BigUint,
    pub proof: SignatureShareProof,
}

/// The artifact `D_I` retained once subset presigning completes:
/// `(x_I, [(id, h_i, sigma_i)]_{i in I})` (`spec.md` §4.F phase 4).
#[derive(Debug, Clone)]
pub struct PresigningArtifact {
    pub x_i: i64,
    pub dummy_shares: Vec<(PartyId, BigUint, SignatureShare)>,
}

/// Per-subset presigning state (`spec.md` §3), created on first use of a
/// subset and cached for reuse (`spec.md` §3/§4.F caching invariant).
pub struct PresigningData {
    /// `lambda_{I,i}`, the Lagrange coefficient at 0 for this party within `I`.
    pub lambda_i: BigUint,
    /// `s_{I,i}`, this party's additive share of `Sum_{j not in I} d_j`.
    pub s_i: Secret,
    /// `h_{I,i} = g^{s_i} mod N`.
    pub h_i: BigUint,
    /// Broadcast table of every other member's `h_j` (phase 1).
    pub received_h: HashMap<PartyId, BigUint>,
    /// Dummy-message signature shares received from other members (phase 2/3).
    pub received_dummy_shares: HashMap<PartyId, SignatureShare>,
    /// `x_I`, known once phase 3's exhaustive search completes.
    pub x_i: Option<i64>,
    /// The finished artifact, set at the end of phase 4.
    pub artifact: Option<PresigningArtifact>,
}

impl PresigningData {
    pub fn new(lambda_i: BigUint, s_i: Secret, h_i: BigUint) -> Self {
        PresigningData {
            lambda_i,
            s_i,
            h_i,
            received_h: HashMap::new(),
            received_dummy_shares: HashMap::new(),
            x_i: None,
            artifact: None,
        }
    }
}

/// One participant's persistent state (`spec.md` §3).
pub struct Party {
    pub id: PartyId,
    pub n_parties: u32,
    pub threshold: u32,

    /// `N = p*q`, once Setup finishes. Identical at every party (invariant 6).
    pub modulus_n: Option<BigUint>,
    /// The large sharing prime `M > N` used for additive/Shamir sharing.
    pub sharing_prime: Option<BigUint>,
    /// A generator of (a large subgroup of) `Z_N^*`, shared by all parties.
    pub g: Option<BigUint>,
    /// The public RSA exponent. Identical at every party (invariant 6).
    pub e: u32,

    /// This party's additive share of `p`.
    pub p_i: Option<Secret>,
    /// This party's additive share of `q`.
    pub q_i: Option<Secret>,
    /// This party's additive share of the private exponent `d`.
    pub d_i: Option<Secret>,

    /// `f_{j,i}`: the evaluation of dealer `j`'s Shamir polynomial at this
    /// party's point, received during dealing (`spec.md` §4.E).
    pub received_shares: HashMap<PartyId, Secret>,
    /// `b[j][t] = g^{a_{j,t}} mod N`: dealer `j`'s Feldman commitment table.
    pub commitments: HashMap<PartyId, Vec<BigUint>>,

    /// History of agreeing subsets this party has participated in.
    pub subsets: Vec<Subset>,
    /// Presigning state per subset, created on first use and cached.
    pub presigning_data: HashMap<Subset, PresigningData>,
    /// Scratch buffer of received signature shares for the current message.
    pub sigmas: HashMap<PartyId, SignatureShare>,
}

impl Party {
    pub fn new(id: PartyId, n_parties: u32, threshold: u32, e: u32) -> Self {
        Party {
            id,
            n_parties,
            threshold,
            modulus_n: None,
            sharing_prime: None,
            g: None,
            e,
            p_i: None,
            q_i: None,
            d_i: None,
            received_shares: HashMap::new(),
            commitments: HashMap::new(),
            subsets: Vec::new(),
            presigning_data: HashMap::new(),
            sigmas: HashMap::new(),
        }
    }

    pub fn all_ids(&self) -> impl Iterator<Item = PartyId> {
        (0..self.n_parties).map(PartyId)
    }

    pub fn modulus(&self) -> &BigUint {
        self.modulus_n.as_ref().expect("Setup must run before N is read")
    }

    pub fn sharing_prime(&self) -> &BigUint {
        self.sharing_prime
            .as_ref()
            .expect("Setup must run before M is read")
    }

    pub fn generator(&self) -> &BigUint {
        self.g.as_ref().expect("Setup must run before g is read")
    }

    /// Public key material per `spec.md` §6: `(N, e)`.
    pub fn public_key(&self) -> (BigUint, u32) {
        (self.modulus().clone(), self.e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_complement_excludes_members() {
        let subset = Subset::new(vec![PartyId(0), PartyId(2)]);
        assert_eq!(subset.complement(4), vec![PartyId(1), PartyId(3)]);
    }

    #[test]
    fn subset_equality_is_order_sensitive_by_construction_order() {
        let a = Subset::new(vec![PartyId(0), PartyId(1)]);
        let b = Subset::new(vec![PartyId(1), PartyId(0)]);
        assert_ne!(a, b);
    }
}
