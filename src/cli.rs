//! Interactive driver (`spec.md` §6): the prompt sequence is implemented
//! over generic `BufRead`/`Write` streams rather than hardcoding
//! `stdin`/`stdout`, so `src/bin/threshold-rsa.rs` is a thin shell over
//! [`run_interactive`] and the loop can be driven by a test harness without
//! a real terminal.

use std::io::{BufRead, Write};

use num_bigint_dig::BigUint;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::config::ProtocolParams;
use crate::error::ThresholdRsaError;
use crate::network::Network;
use crate::party::PartyId;

/// Everything that can end the driver loop: malformed input, an I/O
/// failure on the streams themselves, or a protocol abort.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("input/output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse {field} from input")]
    Parse { field: &'static str },
    #[error(transparent)]
    Protocol(#[from] ThresholdRsaError),
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String, CliError> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(String::new());
    }
    Ok(line.trim().to_string())
}

fn parse_u32(field: &'static str, raw: &str) -> Result<u32, CliError> {
    raw.parse().map_err(|_| CliError::Parse { field })
}

/// Parses prompt 3 / the re-agreement prompt (`spec.md` §6): a
/// comma-separated list of party ids, or the empty string (every party
/// disagrees).
fn parse_subset(raw: &str, n: u32) -> Result<Vec<PartyId>, CliError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|token| {
            let id: u32 = token.trim().parse().map_err(|_| CliError::Parse { field: "agreeing party id" })?;
            if id >= n {
                return Err(CliError::Parse { field: "agreeing party id out of range" });
            }
            Ok(PartyId(id))
        })
        .collect()
}

/// Runs the interactive prompt loop of `spec.md` §6: `n`, then `k`, then an
/// agreement list, then `(message, new agreement list)` pairs until the
/// message prompt hits EOF or an empty line. `trusted` selects the fast
/// dealer path for Setup (used by tests) over the fully interactive one (the
/// real deployment default, wired in `src/bin/threshold-rsa.rs`).
pub fn run_interactive<P: ProtocolParams, R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    trusted: bool,
) -> Result<(), CliError> {
    let n = parse_u32("n", &prompt(&mut input, &mut output, "n (number of parties): ")?)?;
    let k = parse_u32("k", &prompt(&mut input, &mut output, "k (threshold, 1 < k <= n): ")?)?;
    if !(k > 1 && k <= n) {
        return Err(CliError::Parse { field: "k (must satisfy 1 < k <= n)" });
    }

    let mut rng = StdRng::from_entropy();
    let mut network = Network::<P>::new(n, k);
    writeln!(output, "running setup for n={n}, k={k}...")?;
    network.run_setup(trusted, &mut rng)?;
    let (modulus_n, e) = network.parties[0].public_key();
    writeln!(output, "setup complete; public key (N, e) = ({modulus_n}, {e})")?;

    let mut agreeing = parse_subset(&prompt(&mut input, &mut output, "agreeing party ids (comma-separated): ")?, n)?;

    loop {
        let message_line = prompt(&mut input, &mut output, "message (integer), empty to quit: ")?;
        if message_line.is_empty() {
            break;
        }
        let message =
            BigUint::parse_bytes(message_line.as_bytes(), 10).ok_or(CliError::Parse { field: "message" })?;

        match network.run_signing_session(&message, &agreeing, &mut rng)? {
            Some((m, signature)) => writeln!(output, "signature({m}) = {signature}")?,
            None => writeln!(output, "only {} of {k} required parties agreed; signing skipped", agreeing.len())?,
        }

        agreeing = parse_subset(&prompt(&mut input, &mut output, "agreeing party ids (comma-separated): ")?, n)?;
    }
    writeln!(output, "shutting down")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestParams;
    use std::io::Cursor;

    #[test]
    fn clean_session_signs_one_message_and_exits() {
        let script = "3\n2\n0,1\n42\n\n\n";
        let input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();

        run_interactive::<TestParams, _, _>(input, &mut output, true).unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("setup complete"));
        assert!(transcript.contains("signature(42)"));
        assert!(transcript.contains("shutting down"));
    }

    #[test]
    fn insufficient_agreement_is_reported_not_fatal() {
        let script = "4\n3\n0,1\n7\n\n\n";
        let input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();

        run_interactive::<TestParams, _, _>(input, &mut output, true).unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("signing skipped"));
    }

    #[test]
    fn malformed_k_is_rejected_before_setup_runs() {
        let script = "3\n5\n";
        let input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();

        let result = run_interactive::<TestParams, _, _>(input, &mut output, true);
        assert!(matches!(result, Err(CliError::Parse { field: "k (must satisfy 1 < k <= n)" })));
    }
}
