//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

/// Issue a self-signed TLS identity certificate for this host.
///
/// Generates an RSA key and a self-signed X.509 certificate, writes both as
/// PEM (the key owner-readable only), and maintains an entropy seed file
/// across runs. Hostname and domain default to system values.
#[derive(Parser, Debug)]
#[command(name = "agentcert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Private key output path
    #[arg(short = 'k', long)]
    pub key: Option<PathBuf>,

    /// Certificate output path
    #[arg(short = 'c', long)]
    pub cert: Option<PathBuf>,

    /// Validity start as a day offset from now (may be negative)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub start_days: i64,

    /// Validity end as a day offset from now (must exceed start)
    #[arg(long, default_value_t = 3650, allow_hyphen_values = true)]
    pub end_days: i64,

    /// Host label for the certificate subject (default: system hostname)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Domain name for the certificate subject (default: system domain)
    #[arg(long)]
    pub domain: Option<String>,

    /// RSA key strength in bits
    #[arg(short = 'b', long)]
    pub bits: Option<u32>,

    /// Issue a client-authentication certificate instead of a server one
    #[arg(long)]
    pub client_cert: bool,

    /// Entropy seed file location (default: ~/.agentcert.rnd)
    #[arg(long)]
    pub seed_file: Option<PathBuf>,

    /// Regenerate even if a valid certificate already exists
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Increase verbosity
    #[arg(short, long)]
    pub verbose: bool,
}
