//! Interactive entry point (`spec.md` §6): wires stdin/stdout to
//! [`threshold_rsa::cli::run_interactive`] under production parameters,
//! with `tracing-subscriber` initialized from `RUST_LOG` the way the
//! library's own spans expect to be observed.

use std::io::{stdin, stdout};
use std::process::ExitCode;

use threshold_rsa::cli::run_interactive;
use threshold_rsa::ProductionParams;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let result = run_interactive::<ProductionParams, _, _>(stdin().lock(), stdout().lock(), false);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "aborting");
            ExitCode::FAILURE
        }
    }
}
