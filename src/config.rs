//! Protocol-wide constants, bundled the way `cggmp21::SchemeParams` bundles
//! curve/Paillier choices: a marker type plus a trait, so production and test
//! code can run the same protocol logic at different sizes.

/// Parameters shared by every party in a run. Fixed at compile time via a
/// marker type implementing this trait (see [`ProductionParams`] and
/// [`TestParams`]).
pub trait ProtocolParams: Clone + Send + Sync + 'static {
    /// The public RSA exponent. `65537` unless there is a specific reason to
    /// deviate (there rarely is: it is all but guaranteed to be coprime to
    /// `phi(N)` for random `p, q`).
    const E: u32 = 65537;

    /// Bit length of each of the two secret primes `p`, `q`. `N` is
    /// approximately twice this size.
    const BITS_SECURE: u32;

    /// Trial-division bound used while sieving candidate factors of `p`/`q`
    /// during interactive modulus generation (distributed sieving, §4.C).
    const B1: u64;

    /// Trial-division bound used while validating the finished modulus `N`
    /// (§4.C, parallel trial division). Must exceed `B1`.
    const B2: u64;

    /// Lower bound (inclusive) of the range `M` is sampled from. `M` must be
    /// prime and larger than `N`.
    const M_BITS_LOW: u32;

    /// Upper bound (exclusive) of the range `M` is sampled from.
    const M_BITS_HIGH: u32;

    /// How many times modulus generation may be retried after a failed
    /// biprimality/trial-division check before the Setup phase is treated as
    /// fatally broken (taxonomy item 1 in the error design).
    const MAX_MODULUS_ATTEMPTS: u32 = 16;

    /// The fixed public test message used for trial decryption while
    /// deriving `d_i` (§4.D step 6).
    const TRIAL_DECRYPTION_MESSAGE: u64 = 1_234_567;
}

/// Full-strength parameters: 1024-bit primes (≈2048-bit `N`), matching
/// `spec.md` §6's stated constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionParams;

impl ProtocolParams for ProductionParams {
    const BITS_SECURE: u32 = 1024;
    const B1: u64 = 1 << 15;
    const B2: u64 = 1 << 19;
    const M_BITS_LOW: u32 = 2050;
    const M_BITS_HIGH: u32 = 2051;
}

/// Small parameters for fast tests. Not secure; never use outside tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestParams;

impl ProtocolParams for TestParams {
    const BITS_SECURE: u32 = 96;
    const B1: u64 = 1 << 6;
    const B2: u64 = 1 << 9;
    const M_BITS_LOW: u32 = 200;
    const M_BITS_HIGH: u32 = 201;
    const MAX_MODULUS_ATTEMPTS: u32 = 64;
}
