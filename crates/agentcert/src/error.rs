//! Error types for certificate issuance.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can abort a certificate issuance.
///
/// Non-fatal conditions (entropy shortfall, IDN conversion failure, seed-file
/// save failure) never surface here; they are reported as warnings on the
/// issuance summary instead.
#[derive(Error, Debug)]
pub enum CertError {
    /// The validity window is empty or inverted.
    #[error("invalid validity window: end offset {end_days} days must exceed start offset {start_days} days")]
    InvalidValidity {
        /// Offset of the validity start from now, in days.
        start_days: i64,
        /// Offset of the validity end from now, in days.
        end_days: i64,
    },

    /// The requested key length is unusable.
    #[error("invalid key length: {0} bits")]
    InvalidKeyLength(u32),

    /// The underlying RSA primitive failed to produce a key pair.
    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] rsa::Error),

    /// The generated key could not be serialized to PKCS#8.
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),

    /// Building or self-signing the certificate failed.
    #[error("certificate signing failed: {0}")]
    Signing(#[from] rcgen::Error),

    /// A key or certificate output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        /// The output path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
