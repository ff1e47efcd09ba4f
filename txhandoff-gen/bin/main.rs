//! A burst generator
//!
//! Sets up the transmit path described by a configuration file and pushes synthetic bursts
//! through it into a loopback device, then reports what arrived. Call example:
//!
//! * `txgen tx.toml -n 100000 -b 32 -l 1470`
//! * `txgen tx.toml --offline` to skip resolving the interfaces on the host.
//!
//! Set `RUST_LOG` to adjust the logging, e.g. `RUST_LOG=txhandoff=debug`.
use std::process;

use tracing_subscriber::EnvFilter;
use txhandoff_gen::config::Options;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = Options::from_args();

    let score = match txhandoff_gen::run(&options) {
        Ok(score) => score,
        Err(err) => {
            eprintln!("[-] {}", err);
            process::exit(1);
        }
    };

    println!("[+] Done\n");
    for (name, port) in score.ports() {
        println!("{}\t{} bursts\t{} packets\t{} bytes", name, port.bursts, port.packets, port.bytes);
    }
    println!("{}", score);
}
