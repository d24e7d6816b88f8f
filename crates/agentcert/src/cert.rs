//! Certificate request construction, self-signing, and output.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair,
    KeyUsagePurpose, PKCS_RSA_SHA256,
};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entropy::{self, EntropySource};
use crate::error::CertError;
use crate::idn::DomainNameEncoder;
use crate::Result;

/// Algorithm a generated key is classified as.
///
/// Only RSA is wired into the generation path; the remaining variants
/// classify key material uniformly and are reserved for future extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// No algorithm specified.
    None,
    /// RSA.
    #[default]
    Rsa,
    /// DSA (reserved).
    Dsa,
    /// Diffie-Hellman (reserved).
    Dh,
    /// Elliptic curve (reserved).
    Ec,
}

/// Serialization format of an output file.
///
/// The generation path produces PEM; ASN.1/DER is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CertificateFormat {
    /// No format specified.
    None,
    /// Binary DER encoding (reserved).
    Asn1,
    /// Base64 text encoding.
    #[default]
    Pem,
}

/// Immutable configuration for one certificate issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRequest {
    /// Where the private key PEM is written.
    pub key_path: PathBuf,
    /// Where the certificate PEM is written.
    pub cert_path: PathBuf,
    /// Validity start, as a day offset from now. May be negative.
    pub start_days: i64,
    /// Validity end, as a day offset from now. Must exceed `start_days`.
    pub end_days: i64,
    /// Host label, used as-is.
    pub hostname: String,
    /// Domain name; may contain non-ASCII labels.
    pub domain: String,
    /// Requested RSA key strength in bits.
    pub bits: u32,
    /// Issue a client-authentication certificate instead of a server one.
    #[serde(default)]
    pub client_auth: bool,
}

impl CertificateRequest {
    /// Subject common name: `hostname.domain`, or `hostname` alone when the
    /// domain is empty.
    pub fn common_name(&self, effective_domain: &str) -> String {
        if effective_domain.is_empty() {
            self.hostname.clone()
        } else {
            format!("{}.{effective_domain}", self.hostname)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.end_days <= self.start_days {
            return Err(CertError::InvalidValidity {
                start_days: self.start_days,
                end_days: self.end_days,
            });
        }
        if self.bits == 0 {
            return Err(CertError::InvalidKeyLength(self.bits));
        }
        Ok(())
    }
}

/// Summary of a completed issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCertificate {
    /// Unique identifier of this issuance.
    pub id: Uuid,
    /// Serial number (hex).
    pub serial: String,
    /// Subject common name.
    pub subject: String,
    /// Not valid before.
    pub not_before: DateTime<Utc>,
    /// Not valid after.
    pub not_after: DateTime<Utc>,
    /// Key algorithm used.
    pub algorithm: KeyAlgorithm,
    /// Output file format.
    pub format: CertificateFormat,
    /// Where the key was written.
    pub key_path: PathBuf,
    /// Where the certificate was written.
    pub cert_path: PathBuf,
    /// Non-fatal conditions encountered during issuance.
    pub warnings: Vec<String>,
}

/// One-shot self-signed certificate issuance.
///
/// Callers must serialize concurrent use of the same output path pair; the
/// builder provides no internal locking.
pub struct CertificateBuilder {
    request: CertificateRequest,
    entropy: EntropySource,
    encoder: DomainNameEncoder,
    seed_path: Option<PathBuf>,
}

impl CertificateBuilder {
    /// Builder with the default entropy chain, IDN search path, and seed
    /// file location.
    pub fn new(request: CertificateRequest) -> Self {
        let seed_path = entropy::default_seed_path();
        Self {
            entropy: EntropySource::new(entropy::default_providers(seed_path.as_deref())),
            encoder: DomainNameEncoder::new(),
            seed_path,
            request,
        }
    }

    /// Override the seed file used both as a provider in the entropy chain
    /// and as the target of the refreshed seed written after issuance.
    pub fn with_seed_path(mut self, seed_path: PathBuf) -> Self {
        self.entropy = EntropySource::new(entropy::default_providers(Some(&seed_path)));
        self.seed_path = Some(seed_path);
        self
    }

    /// Builder with injected collaborators (tests, custom deployments).
    pub fn with_parts(
        request: CertificateRequest,
        entropy: EntropySource,
        encoder: DomainNameEncoder,
        seed_path: Option<PathBuf>,
    ) -> Self {
        Self {
            request,
            entropy,
            encoder,
            seed_path,
        }
    }

    /// Generate the key pair and self-signed certificate, write both files,
    /// and persist a refreshed entropy seed.
    ///
    /// Fatal error order: configuration is checked before any resource is
    /// touched; the certificate file is only written after the key has been
    /// generated, the certificate signed, and the key file written.
    pub fn generate(&mut self) -> Result<IssuedCertificate> {
        self.request.validate()?;

        let mut warnings = Vec::new();

        if !self.entropy.is_loaded() {
            self.entropy.load();
        }
        let shortfall = self.entropy.shortfall();
        if shortfall > 0 {
            warnings.push(format!(
                "entropy shortfall: obtained {} of {} required bytes",
                self.entropy.harvested(),
                self.entropy.harvested() + shortfall,
            ));
        }

        let mut idn_diagnostics = String::new();
        let effective_domain = self
            .encoder
            .encode(&self.request.domain, &mut idn_diagnostics);
        if !idn_diagnostics.is_empty() {
            warn!(domain = %self.request.domain, "IDN conversion fell back: {}", idn_diagnostics.trim_end());
            warnings.push(idn_diagnostics.trim_end().to_owned());
        }
        let common_name = self.request.common_name(&effective_domain);

        let key_pem = self.generate_key_pem()?;
        let key_pair = KeyPair::from_pem_and_sign_algo(&key_pem, &PKCS_RSA_SHA256)?;

        // One instant anchors both the embedded validity and the summary,
        // so the two cannot drift apart by the key-generation duration.
        let issued_at = SystemTime::now();
        let serial = Uuid::new_v4();
        let certificate = self.build_certificate(&common_name, serial, issued_at, &key_pair)?;

        // Key first, certificate only after signing and the key write both
        // succeeded: a fatal error never leaves a certificate without a key.
        entropy::write_owner_only(&self.request.key_path, key_pem.as_bytes()).map_err(
            |source| CertError::OutputWrite {
                path: self.request.key_path.clone(),
                source,
            },
        )?;
        fs::write(&self.request.cert_path, certificate.pem()).map_err(|source| {
            CertError::OutputWrite {
                path: self.request.cert_path.clone(),
                source,
            }
        })?;

        if let Some(seed_path) = self.seed_path.clone() {
            self.persist_seed(&seed_path, &mut warnings);
        }

        let now: DateTime<Utc> = issued_at.into();
        let issued = IssuedCertificate {
            id: Uuid::new_v4(),
            serial: format!("{:016x}", serial.as_u128() as u64),
            subject: common_name,
            not_before: now + Duration::days(self.request.start_days),
            not_after: now + Duration::days(self.request.end_days),
            algorithm: KeyAlgorithm::Rsa,
            format: CertificateFormat::Pem,
            key_path: self.request.key_path.clone(),
            cert_path: self.request.cert_path.clone(),
            warnings,
        };
        info!(
            subject = %issued.subject,
            cert = %issued.cert_path.display(),
            "certificate issued"
        );
        Ok(issued)
    }

    /// Generate the RSA key, seeded from the harvested entropy pool.
    fn generate_key_pem(&self) -> Result<String> {
        let mut rng = ChaCha20Rng::from_seed(self.entropy.key_seed());
        let key = RsaPrivateKey::new(&mut rng, self.request.bits as usize)?;
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|err| CertError::KeyEncoding(err.to_string()))?;
        Ok(pem.to_string())
    }

    fn build_certificate(
        &self,
        common_name: &str,
        serial: Uuid,
        issued_at: SystemTime,
        key_pair: &KeyPair,
    ) -> Result<rcgen::Certificate> {
        // SAN entries are IA5 (ASCII) strings. When IDN conversion fell back
        // and left a non-ASCII subject, the name goes in the CN only.
        let mut params = if common_name.is_ascii() {
            CertificateParams::new(vec![common_name.to_owned()])?
        } else {
            CertificateParams::default()
        };

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;

        let now = time::OffsetDateTime::from(issued_at);
        params.not_before = now + time::Duration::days(self.request.start_days);
        params.not_after = now + time::Duration::days(self.request.end_days);

        params.serial_number = Some((serial.as_u128() as u64).into());

        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        // Server and client identities carry distinct extended usages.
        params.extended_key_usages = vec![if self.request.client_auth {
            ExtendedKeyUsagePurpose::ClientAuth
        } else {
            ExtendedKeyUsagePurpose::ServerAuth
        }];

        Ok(params.self_signed(key_pair)?)
    }

    /// Seed persistence is best-effort: the certificate is already on disk.
    fn persist_seed(&self, seed_path: &Path, warnings: &mut Vec<String>) {
        if let Err(err) = self.entropy.save(seed_path) {
            warn!(
                path = %seed_path.display(),
                error = %err,
                "failed to persist refreshed entropy seed"
            );
            warnings.push(format!(
                "failed to persist entropy seed to {}: {err}",
                seed_path.display()
            ));
        }
    }
}

/// Whether `cert_path` holds a well-formed certificate whose validity window
/// covers the current time.
///
/// Used to skip regeneration when a current certificate already exists. Any
/// parse failure counts as "not current".
pub fn certificate_is_current(cert_path: &Path) -> bool {
    let Ok(pem_text) = fs::read_to_string(cert_path) else {
        return false;
    };
    let Ok(block) = pem::parse(&pem_text) else {
        return false;
    };
    if block.tag() != "CERTIFICATE" {
        return false;
    }
    let Ok((_, parsed)) = x509_parser::parse_x509_certificate(block.contents()) else {
        return false;
    };
    parsed.validity().is_valid()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start_days: i64, end_days: i64) -> CertificateRequest {
        CertificateRequest {
            key_path: PathBuf::from("/tmp/key.pem"),
            cert_path: PathBuf::from("/tmp/cert.pem"),
            start_days,
            end_days,
            hostname: "agentbox".into(),
            domain: "example.com".into(),
            bits: 2048,
            client_auth: false,
        }
    }

    #[test]
    fn inverted_window_is_a_configuration_error() {
        let err = request(10, 5).validate().unwrap_err();
        assert!(matches!(
            err,
            CertError::InvalidValidity {
                start_days: 10,
                end_days: 5
            }
        ));
    }

    #[test]
    fn empty_window_is_a_configuration_error() {
        assert!(request(7, 7).validate().is_err());
    }

    #[test]
    fn zero_key_length_is_a_configuration_error() {
        let mut req = request(-1, 365);
        req.bits = 0;
        assert!(matches!(
            req.validate().unwrap_err(),
            CertError::InvalidKeyLength(0)
        ));
    }

    #[test]
    fn common_name_joins_host_and_domain() {
        let req = request(-1, 365);
        assert_eq!(req.common_name("example.com"), "agentbox.example.com");
        assert_eq!(req.common_name(""), "agentbox");
    }

    #[test]
    fn failed_validation_writes_no_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut req = request(10, 5);
        req.key_path = dir.path().join("key.pem");
        req.cert_path = dir.path().join("cert.pem");

        let mut builder = CertificateBuilder::with_parts(
            req.clone(),
            EntropySource::with_target(Vec::new(), 32),
            DomainNameEncoder::with_search_dirs(Vec::new()),
            None,
        );
        assert!(builder.generate().is_err());
        assert!(!req.key_path.exists());
        assert!(!req.cert_path.exists());
    }

    #[test]
    fn missing_certificate_is_not_current() {
        assert!(!certificate_is_current(Path::new("/nonexistent/cert.pem")));
    }

    #[test]
    fn garbage_certificate_is_not_current() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cert.pem");
        fs::write(&path, "not a certificate").expect("write");
        assert!(!certificate_is_current(&path));
    }
}
