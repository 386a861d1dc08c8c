//! Error taxonomy, per `spec.md` §7.
//!
//! Fatal errors unwind the current operation (Setup or a signing attempt) to
//! the caller; `BadModulus` is the one transient case and is retried by the
//! modulus-generation loop itself up to `ProtocolParams::MAX_MODULUS_ATTEMPTS`
//! times before it, too, is surfaced as fatal.

use thiserror::Error;

use crate::party::PartyId;

/// Taxonomy item 1: trial division or the biprimality check rejected the
/// candidate modulus. Transient — the caller should regenerate `N`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BadModulus {
    #[error("N is divisible by a small prime")]
    TrialDivisionFailed,
    #[error("N failed the biprimality test")]
    BiprimalityFailed,
}

/// Everything that can end a Setup run or a signing attempt.
#[derive(Debug, Error)]
pub enum ThresholdRsaError {
    /// Taxonomy item 1, exhausted retries.
    #[error("could not produce a valid modulus after {attempts} attempts: {cause}")]
    ModulusGenerationExhausted { attempts: u32, cause: BadModulus },

    /// Taxonomy item 2: a dealer's Feldman commitment did not check out
    /// against the share it sent.
    #[error("dealer {dealer} sent a share failing its own Feldman commitment")]
    DealerMisbehavior { dealer: PartyId },

    /// Taxonomy item 3: a signature-share proof failed verification.
    #[error("party {party} produced a signature share with an invalid proof")]
    InvalidSignatureShare { party: PartyId },

    /// Taxonomy item 5: a barrier did not receive a message from every
    /// expected party.
    #[error("expected {expected} messages at this barrier, received {received}")]
    MissingBroadcast { expected: usize, received: usize },

    /// Taxonomy item 6: parties disagree on the exhaustive-search result
    /// for `x_I`.
    #[error("party {party} computed x_I = {theirs}, but this party computed x_I = {ours}")]
    InconsistentXI { party: PartyId, ours: i64, theirs: i64 },

    /// Taxonomy item 7: an arithmetic precondition that the protocol assumes
    /// was violated (e.g. `gcd(a, M) != 1`, or no `epsilon` found in trial
    /// decryption).
    #[error("arithmetic precondition violated: {0}")]
    ArithmeticPrecondition(String),

    /// A subset presigning run was requested for a subset already cached;
    /// re-running phases 0-4 on it is a programming error (the caching
    /// invariant in `spec.md` §3/§4.F).
    #[error("subset presigning already ran for this subset; reuse the cached data instead")]
    SubsetAlreadyPresigned,

    /// Fewer than `k` parties agreed to sign. Not fatal — `spec.md` §7 item 4
    /// specifies this is reported, not treated as an error, but the type
    /// exists so callers that want to distinguish "skipped" from "signed"
    /// have something to match on.
    #[error("only {agreed} of {needed} required parties agreed; signing skipped")]
    InsufficientAgreement { agreed: usize, needed: usize },
}

pub type Result<T> = core::result::Result<T, ThresholdRsaError>;
