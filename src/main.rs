//! pki-certgen - issue a self-signed CA and a CA-signed server certificate
//!
//! ```bash
//! pki-certgen --cn example.com --sans example.com www.example.com --days 30 --key-size 2048
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use pki_certgen::cli::Cli;
use pki_certgen::generate;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Usage errors exit here, before anything is written
    let cli = Cli::parse();
    let request = cli.into_request()?;

    info!(
        "Generating CA and server certificate for '{}' ({} days, {}-bit RSA)",
        request.common_name, request.validity_days, request.key_size
    );
    generate(&request)?;

    Ok(())
}
