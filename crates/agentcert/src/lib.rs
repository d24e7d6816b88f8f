//! agentcert: self-signed X.509 host certificates for an agent's TLS identity.
//!
//! One-shot, synchronous certificate issuance for a host that needs to present
//! a TLS identity without a CA. The pipeline runs once per invocation:
//!
//! ```text
//! entropy (device chain + persisted seed)
//!        │
//!        ▼
//! domain normalization (optional libidn, best-effort)
//!        │
//!        ▼
//! RSA key ──► self-signed certificate ──► PEM files (key is 0600)
//!        │
//!        ▼
//! refreshed seed persisted for the next run
//! ```
//!
//! # Failure model
//!
//! - Invalid configuration (validity window, key length) fails before any
//!   resource is touched.
//! - Key generation, signing, and key/certificate writes are fatal.
//! - Entropy shortfall and IDN conversion failure are warnings: generation
//!   completes and the warnings are carried on the returned summary.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentcert::{CertificateBuilder, CertificateRequest};
//!
//! let request = CertificateRequest {
//!     key_path: "/etc/agentcert/host-key.pem".into(),
//!     cert_path: "/etc/agentcert/host-cert.pem".into(),
//!     start_days: -1,
//!     end_days: 3650,
//!     hostname: "agentbox".into(),
//!     domain: "example.com".into(),
//!     bits: 2048,
//!     client_auth: false,
//! };
//! let issued = CertificateBuilder::new(request).generate()?;
//! println!("issued {} until {}", issued.subject, issued.not_after);
//! ```

pub mod cert;
pub mod entropy;
pub mod error;
pub mod idn;
pub mod libfind;

// Re-exports for convenience.
pub use cert::{
    certificate_is_current, CertificateBuilder, CertificateFormat, CertificateRequest,
    IssuedCertificate, KeyAlgorithm,
};
pub use entropy::{EntropyProvider, EntropySource};
pub use error::CertError;
pub use idn::DomainNameEncoder;

/// Result type for agentcert operations.
pub type Result<T> = std::result::Result<T, CertError>;
