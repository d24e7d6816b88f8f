//! CLI argument parsing and certificate issuance.

pub mod args;

use std::path::PathBuf;

use anyhow::{Context, Result};
use args::Cli;
use clap::Parser;
use tracing::{info, warn};

use agentcert::{certificate_is_current, CertificateBuilder, CertificateRequest};

use crate::config::Config;
use crate::hostinfo;

const DEFAULT_BITS: u32 = 2048;
const DEFAULT_KEY_FILE: &str = "agent-key.pem";
const DEFAULT_CERT_FILE: &str = "agent-cert.pem";

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load on-disk defaults; flags always win.
    let config = Config::load().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable config file");
        Config::default()
    });

    let key_path = cli
        .key
        .or(config.key_path)
        .unwrap_or_else(|| default_output_dir().join(DEFAULT_KEY_FILE));
    let cert_path = cli
        .cert
        .or(config.cert_path)
        .unwrap_or_else(|| default_output_dir().join(DEFAULT_CERT_FILE));
    let seed_path = cli
        .seed_file
        .or(config.seed_file)
        .or_else(agentcert::entropy::default_seed_path);

    if !cli.force && key_path.exists() && certificate_is_current(&cert_path) {
        info!(cert = %cert_path.display(), "certificate is still valid; nothing to do");
        println!("{} is still valid; use --force to regenerate", cert_path.display());
        return Ok(());
    }

    if let Some(parent) = cert_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if let Some(parent) = key_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let request = CertificateRequest {
        key_path,
        cert_path,
        start_days: cli.start_days,
        end_days: cli.end_days,
        hostname: cli.hostname.unwrap_or_else(hostinfo::system_hostname),
        domain: cli.domain.unwrap_or_else(hostinfo::system_domain),
        bits: cli.bits.or(config.bits).unwrap_or(DEFAULT_BITS),
        client_auth: cli.client_cert,
    };

    let mut builder = CertificateBuilder::new(request);
    if let Some(seed) = seed_path {
        builder = builder.with_seed_path(seed);
    }

    let issued = builder.generate().context("certificate generation failed")?;

    for warning in &issued.warnings {
        eprintln!("warning: {warning}");
    }
    println!(
        "issued {} ({} .. {})\n  key:  {}\n  cert: {}",
        issued.subject,
        issued.not_before.format("%Y-%m-%d"),
        issued.not_after.format("%Y-%m-%d"),
        issued.key_path.display(),
        issued.cert_path.display(),
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_output_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("agentcert")
}
