//! Entropy acquisition for key generation.
//!
//! Random material is harvested from an ordered chain of providers and pooled
//! until a fixed target is met. The chain is walked in strict priority order
//! and stops as soon as the pool is full:
//!
//! 1. the non-blocking kernel device (`/dev/urandom`),
//! 2. the blocking kernel device (`/dev/random`), bounded by a maximum wait,
//! 3. a seed file persisted by a previous run.
//!
//! Harvesting never fails. A provider that is missing, unreadable, or slow
//! simply contributes zero bytes; a pool that ends short of the target is
//! reported as a warning, not an error, so issuance is never blocked by a
//! constrained system. After use the pool is written back to the seed file
//! mixed with time-varying input, so the persisted seed is never a verbatim
//! copy of material that already seeded a key.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Bytes of entropy required to seed key generation.
///
/// Fixed, independent of the requested key size.
pub const SEED_BYTES: usize = 1024;

/// How long the blocking device provider may wait in total before giving up.
pub const BLOCKING_DEVICE_MAX_WAIT: Duration = Duration::from_secs(5);

const DEV_URANDOM: &str = "/dev/urandom";
const DEV_RANDOM: &str = "/dev/random";

/// A single source of random bytes.
///
/// Providers are infallible by contract: any internal failure (device
/// missing, permission denied, read error) is swallowed and reported as
/// "zero bytes harvested". The chain order is decided by the caller, which
/// keeps it testable with fakes.
pub trait EntropyProvider {
    /// Short diagnostic name of this provider.
    fn name(&self) -> &str;

    /// Fill as much of `buf` as this provider can. Returns the number of
    /// bytes actually written, which may be zero.
    fn fill(&mut self, buf: &mut [u8]) -> usize;
}

/// The non-blocking kernel random device.
pub struct DevUrandom {
    path: PathBuf,
}

impl DevUrandom {
    /// Provider reading from `/dev/urandom`.
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEV_URANDOM),
        }
    }

    /// Provider reading from an alternate device path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for DevUrandom {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyProvider for DevUrandom {
    fn name(&self) -> &str {
        "urandom"
    }

    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let Ok(mut file) = fs::File::open(&self.path) else {
            return 0;
        };
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) | Err(_) => break,
                Ok(n) => filled += n,
            }
        }
        filled
    }
}

/// The blocking kernel random device, bounded by a maximum total wait.
///
/// The device is opened non-blocking and polled; once the deadline passes,
/// whatever was read so far is returned and the chain moves on. This keeps
/// the overall `load` bounded even on hosts where the blocking pool never
/// fills.
pub struct DevRandom {
    path: PathBuf,
    max_wait: Duration,
}

impl DevRandom {
    /// Provider reading from `/dev/random` with the default wait bound.
    pub fn new() -> Self {
        Self::with_path(DEV_RANDOM, BLOCKING_DEVICE_MAX_WAIT)
    }

    /// Provider reading from an alternate device path with a custom bound.
    pub fn with_path(path: impl Into<PathBuf>, max_wait: Duration) -> Self {
        Self {
            path: path.into(),
            max_wait,
        }
    }
}

impl Default for DevRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyProvider for DevRandom {
    fn name(&self) -> &str {
        "random"
    }

    #[cfg(unix)]
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        use std::os::unix::fs::OpenOptionsExt;

        let opened = fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path);
        let Ok(mut file) = opened else {
            return 0;
        };

        let deadline = Instant::now() + self.max_wait;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(_) => break,
            }
        }
        filled
    }

    #[cfg(not(unix))]
    fn fill(&mut self, _buf: &mut [u8]) -> usize {
        0
    }
}

/// A seed file persisted by a previous run (or supplied by the user).
pub struct SeedFile {
    path: PathBuf,
}

impl SeedFile {
    /// Provider reading a persisted seed file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EntropyProvider for SeedFile {
    fn name(&self) -> &str {
        "seed-file"
    }

    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let Ok(mut file) = fs::File::open(&self.path) else {
            return 0;
        };
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) | Err(_) => break,
                Ok(n) => filled += n,
            }
        }
        filled
    }
}

/// Well-known location of the persisted seed file.
pub fn default_seed_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".agentcert.rnd"))
}

/// The default provider chain: urandom, then the bounded blocking device,
/// then the persisted seed from the previous run.
pub fn default_providers(seed_path: Option<&Path>) -> Vec<Box<dyn EntropyProvider>> {
    let mut providers: Vec<Box<dyn EntropyProvider>> =
        vec![Box::new(DevUrandom::new()), Box::new(DevRandom::new())];
    if let Some(path) = seed_path {
        providers.push(Box::new(SeedFile::new(path)));
    }
    providers
}

/// Pools random bytes from an ordered provider chain.
///
/// Created fresh per issuance, consumed exactly once by key generation.
pub struct EntropySource {
    providers: Vec<Box<dyn EntropyProvider>>,
    pool: Vec<u8>,
    target: usize,
    loaded: bool,
}

impl EntropySource {
    /// Source drawing from `providers` in order, targeting [`SEED_BYTES`].
    pub fn new(providers: Vec<Box<dyn EntropyProvider>>) -> Self {
        Self::with_target(providers, SEED_BYTES)
    }

    /// Source with an explicit target size.
    pub fn with_target(providers: Vec<Box<dyn EntropyProvider>>, target: usize) -> Self {
        Self {
            providers,
            pool: Vec::with_capacity(target),
            target,
            loaded: false,
        }
    }

    /// Whether `load` already ran.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Bytes harvested so far.
    pub fn harvested(&self) -> usize {
        self.pool.len()
    }

    /// Bytes still missing from the target. Zero once the pool is full.
    pub fn shortfall(&self) -> usize {
        self.target.saturating_sub(self.pool.len())
    }

    /// Walk the provider chain until the pool reaches its target.
    ///
    /// Never fails. Returns the total number of bytes harvested; a result
    /// below the target is logged as a warning and left to the caller to
    /// surface as a diagnostic.
    pub fn load(&mut self) -> usize {
        self.loaded = true;
        let mut buf = vec![0u8; self.target];
        for provider in &mut self.providers {
            let missing = self.target - self.pool.len();
            if missing == 0 {
                break;
            }
            let got = provider.fill(&mut buf[..missing]);
            let got = got.min(missing);
            self.pool.extend_from_slice(&buf[..got]);
            debug!(provider = provider.name(), bytes = got, "entropy harvested");
        }
        if self.pool.len() < self.target {
            warn!(
                obtained = self.pool.len(),
                required = self.target,
                "insufficient entropy available; proceeding with degraded randomness"
            );
        }
        self.pool.len()
    }

    /// Condition the pool into a 32-byte seed for the key-generation RNG.
    ///
    /// The pool is hashed together with the current time and process id, so
    /// two invocations never derive the same seed even when every provider
    /// came up empty.
    pub fn key_seed(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(&self.pool);
        hasher.update(now_nanos().to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());
        hasher.finalize().into()
    }

    /// Persist a refreshed seed for the next run.
    ///
    /// The written bytes are derived from the pool mixed with a time-varying
    /// input and expanded through ChaCha20; the material that seeded this
    /// invocation's key is never exported verbatim.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut hasher = Sha256::new();
        hasher.update(&self.pool);
        hasher.update(now_nanos().to_le_bytes());
        hasher.update(b"agentcert.seed.v1");
        let seed: [u8; 32] = hasher.finalize().into();

        let mut rng = ChaCha20Rng::from_seed(seed);
        let mut fresh = vec![0u8; self.target];
        rng.fill_bytes(&mut fresh);

        write_owner_only(path, &fresh)?;
        debug!(path = %path.display(), bytes = fresh.len(), "entropy seed persisted");
        Ok(())
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos())
}

/// Write `bytes` to `path` readable by the owning user only.
#[cfg(unix)]
pub(crate) fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    // The mode only applies on create; clamp pre-existing files too.
    let mut perms = file.metadata()?.permissions();
    perms.set_mode(0o600);
    file.set_permissions(perms)?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(path, bytes)
}
