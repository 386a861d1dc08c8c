//! Process-wide orchestration (`spec.md` §5/§9, "Shared network"): the
//! `Network` owns every `Party` and drives Setup and signing as a sequence
//! of barriers, exactly the "drive loop" the source allows for a
//! single-process reference implementation — every phase runs to
//! completion at every party before the next begins.
//!
//! `Broadcast`/`LoopbackNetwork` model the authenticated broadcast
//! transport `spec.md` §6 assumes the core is driven by: delivery always
//! clones the payload per recipient (§5, "every message MUST be copied")
//! so no receiver observes the sender's state changing out from under it.

use std::collections::HashMap;
use std::marker::PhantomData;

use num_bigint_dig::{BigInt, BigUint};
use num_traits::One;
use rand::{CryptoRng, Rng};
use tracing::{info, info_span};

use crate::arithmetic::{powmod, random_range};
use crate::config::ProtocolParams;
use crate::error::ThresholdRsaError;
use crate::keygen::generate_private_key_shares;
use crate::modulus::{generate_modulus_interactive, generate_modulus_trusted};
use crate::party::{Party, PartyId, SignatureShare, Subset};
use crate::presign::run_subset_presigning;
use crate::secret::{expose_as_bigint, secret_from_bigint};
use crate::sign::{combine_signature_shares, generate_signature_share, verify_signature_share};
use crate::vss::deal_and_verify;

/// Authenticated broadcast with identified senders (`spec.md` §6). Delivery
/// is always copy-on-send, matching §5's cross-party isolation requirement.
pub trait Broadcast {
    fn broadcast<T: Clone>(&self, payload: &T, recipients: &[PartyId]) -> HashMap<PartyId, T>;
}

/// The in-process transport used when every party is co-resident in one
/// `Network`. Still copies every payload, so the single-process case can't
/// accidentally rely on shared mutable state between parties.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackNetwork;

impl Broadcast for LoopbackNetwork {
    fn broadcast<T: Clone>(&self, payload: &T, recipients: &[PartyId]) -> HashMap<PartyId, T> {
        recipients.iter().map(|id| (*id, payload.clone())).collect()
    }
}

/// Owns every party's state and drives Setup / signing sessions
/// (`spec.md` §5/§9). `P` fixes the protocol parameters for the run.
pub struct Network<P: ProtocolParams> {
    pub parties: Vec<Party>,
    pub transport: LoopbackNetwork,
    _params: PhantomData<P>,
}

impl<P: ProtocolParams> Network<P> {
    pub fn new(n_parties: u32, threshold: u32) -> Self {
        let parties = (0..n_parties).map(|i| Party::new(PartyId(i), n_parties, threshold, P::E)).collect();
        Network { parties, transport: LoopbackNetwork, _params: PhantomData }
    }

    /// Runs Setup (`spec.md` §4.C-E in order): modulus generation, private
    /// key share derivation, then dealing. Populates every party's public
    /// and per-share state. `trusted` selects the fast dealer path used by
    /// tests over the fully interactive one.
    pub fn run_setup<R: Rng + CryptoRng>(&mut self, trusted: bool, rng: &mut R) -> Result<(), ThresholdRsaError> {
        let n = self.parties.len();
        let span = info_span!("setup", n_parties = n, threshold = self.parties[0].threshold);
        let _enter = span.enter();

        let modulus_setup = if trusted {
            generate_modulus_trusted::<P, R>(n, rng)
        } else {
            generate_modulus_interactive::<P, R>(n, rng).map_err(|(attempts, cause)| {
                ThresholdRsaError::ModulusGenerationExhausted { attempts, cause }
            })?
        };
        info!(bits = modulus_setup.modulus_n.bits(), "modulus established");

        // A uniform element of Z_N generates a large enough subgroup with
        // overwhelming probability for random N; no primality structure on g
        // itself is required (spec.md §3 invariant 6, §4.C biprimality_test
        // samples its own g the same way).
        let g = random_range(rng, &BigUint::one(), &modulus_setup.modulus_n);
        let d_shares = generate_private_key_shares::<P, R>(
            n,
            &modulus_setup.modulus_n,
            &modulus_setup.p_shares,
            &modulus_setup.q_shares,
            rng,
        )?;

        let dealing = deal_and_verify(
            n,
            self.parties[0].threshold as usize,
            &modulus_setup.modulus_n,
            &modulus_setup.sharing_prime,
            &g,
            &d_shares,
            rng,
        )?;
        info!("dealing verified for every (dealer, receiver) pair");

        let all_ids: Vec<PartyId> = (0..n as u32).map(PartyId).collect();
        for (i, party) in self.parties.iter_mut().enumerate() {
            party.modulus_n = Some(modulus_setup.modulus_n.clone());
            party.sharing_prime = Some(modulus_setup.sharing_prime.clone());
            party.g = Some(g.clone());
            party.p_i = Some(secret_from_bigint(&modulus_setup.p_shares[i]));
            party.q_i = Some(secret_from_bigint(&modulus_setup.q_shares[i]));
            party.d_i = Some(secret_from_bigint(&d_shares[i]));

            // Every dealer's commitment table is public; broadcast to all.
            for dealer in 0..n {
                let delivered = self.transport.broadcast(&dealing.commitments[dealer], &all_ids);
                party.commitments.insert(PartyId(dealer as u32), delivered[&party.id].clone());
                let share = self.transport.broadcast(&dealing.received_shares[dealer][i], &[party.id]);
                party.received_shares.insert(PartyId(dealer as u32), secret_from_bigint(&share[&party.id]));
            }
        }
        Ok(())
    }

    /// Reconstructs the public commitment table and the full
    /// dealer-by-receiver share matrix from every party's local state
    /// (each party only ever kept the row addressed to itself; the
    /// orchestrator, which is co-resident with every party in this
    /// single-process build, can read all rows back out to hand to
    /// `crate::presign`).
    fn dealing_state(&self) -> (Vec<Vec<BigUint>>, Vec<Vec<BigInt>>, Vec<BigInt>) {
        let n = self.parties.len();
        let commitments: Vec<Vec<BigUint>> =
            (0..n).map(|dealer| self.parties[0].commitments[&PartyId(dealer as u32)].clone()).collect();
        let received_shares: Vec<Vec<BigInt>> = (0..n)
            .map(|dealer| {
                (0..n)
                    .map(|receiver| expose_as_bigint(&self.parties[receiver].received_shares[&PartyId(dealer as u32)]))
                    .collect()
            })
            .collect();
        let d_shares: Vec<BigInt> = self.parties.iter().map(|party| expose_as_bigint(party.d_i.as_ref().unwrap())).collect();
        (commitments, received_shares, d_shares)
    }

    /// Ensures `subset` has cached presigning data (`spec.md` §4.F caching
    /// invariant); a no-op if it already does.
    fn ensure_presigned<R: Rng + CryptoRng>(&mut self, subset: &Subset, rng: &mut R) -> Result<(), ThresholdRsaError> {
        if self.parties[subset.iter().next().unwrap().index()].presigning_data.contains_key(subset) {
            return Ok(());
        }
        let span = info_span!("presign", subset = ?subset);
        let _enter = span.enter();

        let n = self.parties.len();
        let modulus_n = self.parties[0].modulus().clone();
        let sharing_prime = self.parties[0].sharing_prime().clone();
        let g = self.parties[0].generator().clone();
        let (commitments, received_shares, d_shares) = self.dealing_state();

        let per_party = run_subset_presigning::<P, R>(
            subset,
            n,
            &modulus_n,
            &sharing_prime,
            &g,
            &commitments,
            &received_shares,
            &d_shares,
            rng,
        )?;

        for (id, data) in per_party {
            let party = &mut self.parties[id.index()];
            party.subsets.push(subset.clone());
            party.presigning_data.insert(subset.clone(), data);
        }
        info!("presigning complete");
        Ok(())
    }

    /// Runs a full signing session for `message` with the given agreeing
    /// parties (`spec.md` §6): `Ok(None)` if fewer than `k` agreed
    /// (taxonomy item 4, not an error); otherwise presigns the subset if
    /// needed, then runs §4.G to produce `(message, signature)`.
    pub fn run_signing_session<R: Rng + CryptoRng>(
        &mut self,
        message: &BigUint,
        agreeing: &[PartyId],
        rng: &mut R,
    ) -> Result<Option<(BigUint, BigUint)>, ThresholdRsaError> {
        let threshold = self.parties[0].threshold as usize;
        if agreeing.len() < threshold {
            info!(agreed = agreeing.len(), needed = threshold, "insufficient agreement, signing skipped");
            return Ok(None);
        }
        let subset = Subset::new(agreeing[..threshold].to_vec());
        self.ensure_presigned(&subset, rng)?;

        let modulus_n = self.parties[0].modulus().clone();
        let sharing_prime = self.parties[0].sharing_prime().clone();
        let g = self.parties[0].generator().clone();

        let mut shares: HashMap<PartyId, SignatureShare> = HashMap::new();
        for id in subset.iter().copied() {
            let party = &self.parties[id.index()];
            let data = &party.presigning_data[&subset];
            let alpha = expose_as_bigint(&data.s_i) + expose_as_bigint(party.d_i.as_ref().unwrap());
            let public_point = (&party.commitments[&id][0] * &data.h_i) % &modulus_n;
            let share = generate_signature_share(id, message, &alpha, &public_point, &g, &modulus_n, rng);
            shares.insert(id, share);
        }

        let delivered = self.transport.broadcast(&shares, subset.iter().copied().collect::<Vec<_>>().as_slice());
        for id in subset.iter().copied() {
            self.parties[id.index()].sigmas = delivered[&id].clone();
        }

        for verifier in subset.iter().copied() {
            for id in subset.iter().copied() {
                let party = &self.parties[verifier.index()];
                let data = &party.presigning_data[&subset];
                let h_j = data.received_h.get(&id).cloned().unwrap_or_else(|| data.h_i.clone());
                let public_point = (&party.commitments[&id][0] * &h_j) % &modulus_n;
                let share = &party.sigmas[&id];
                if !verify_signature_share(share, &public_point, &g, &modulus_n) {
                    return Err(ThresholdRsaError::InvalidSignatureShare { party: id });
                }
            }
        }

        let x_i = self.parties[subset.iter().next().unwrap().index()].presigning_data[&subset]
            .x_i
            .expect("presigning populates x_I before returning");
        let c_values: Vec<BigUint> = subset.iter().map(|id| shares[id].c_i.clone()).collect();
        let signature = combine_signature_shares(&c_values, x_i, &sharing_prime, message, &modulus_n);

        let check = powmod(&signature, &BigInt::from(P::E), &modulus_n);
        debug_assert_eq!(&check, message, "signature must satisfy signature^e == message (mod N)");

        for id in subset.iter().copied() {
            self.parties[id.index()].sigmas.clear();
        }
        info!(?message, ?signature, "signature produced");
        Ok(Some((message.clone(), signature)))
    }
}
