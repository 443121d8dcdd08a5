//! Binary entry point: runs the UCI loop on standard input and output.
//! Diagnostics go to stderr so that the protocol stream stays clean; set
//! `RUST_LOG` (e.g. `RUST_LOG=tabiya=debug`) to see them.

use std::io;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    let mut engine = tabiya::engine::Engine::new(&mut input, &mut out);
    engine.uci_loop()
}
