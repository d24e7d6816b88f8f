//! agentcert - self-signed TLS identity certificates for this host.

use anyhow::Result;

fn main() -> Result<()> {
    agentcert_cli::run()
}
