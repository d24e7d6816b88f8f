//! Internationalized domain-name normalization.
//!
//! Certificate subjects must carry ASCII hostnames, so a non-ASCII domain
//! label is converted to its ASCII-compatible form through libidn's
//! `idna_to_ascii_lz` when a usable copy of the library is installed. The
//! library is an optional capability: it is located at call time, loaded for
//! the duration of one `encode`, and released on every exit path. When it is
//! absent or the conversion fails, the raw label is used as-is and an
//! explanation is appended to the caller's diagnostics collector; a prettier
//! subject is never worth failing issuance over.

use std::ffi::{c_char, c_int, CStr, CString};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::ptr;

use libloading::Library;
use tracing::debug;

use crate::libfind;

/// Directories probed for the conversion library, in order.
pub const IDN_SEARCH_DIRS: &[&str] =
    &["/usr/lib", "/usr/lib64", "/usr/local/lib", "/usr/local/lib64"];

/// Versioned filename stem of the conversion library.
const IDN_LIBRARY_STEM: &str = "libidn.so.";

/// Name of the conversion entry point inside the library.
const IDN_ENTRY_POINT: &[u8] = b"idna_to_ascii_lz";

/// `int idna_to_ascii_lz(const char *input, char **output, int flags)`.
/// A zero status means success and `*output` points to a malloc'd C string
/// the caller must free.
type IdnaToAsciiLz = unsafe extern "C" fn(*const c_char, *mut *mut c_char, c_int) -> c_int;

const IDNA_SUCCESS: c_int = 0;

/// Converts a possibly non-ASCII domain label to its ASCII-compatible form.
pub struct DomainNameEncoder {
    search_dirs: Vec<PathBuf>,
}

impl Default for DomainNameEncoder {
    fn default() -> Self {
        Self {
            search_dirs: IDN_SEARCH_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl DomainNameEncoder {
    /// Encoder probing the standard installation directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder probing an explicit directory list (tests, odd layouts).
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// Convert `raw` to an ASCII-compatible label.
    ///
    /// Pure-ASCII input is returned unchanged without touching the library.
    /// On any failure the raw label is returned and a line describing the
    /// failure is appended to `diagnostics`.
    pub fn encode(&self, raw: &str, diagnostics: &mut String) -> String {
        if raw.is_empty() || raw.is_ascii() {
            return raw.to_owned();
        }

        let Some(library_path) = self.locate_library() else {
            let _ = writeln!(
                diagnostics,
                "no {IDN_LIBRARY_STEM}<N> library found; using domain name unconverted"
            );
            return raw.to_owned();
        };

        // Scoped acquisition: the handle lives for this call only and is
        // dropped on every return below.
        let library = match unsafe { Library::new(&library_path) } {
            Ok(library) => library,
            Err(err) => {
                let _ = writeln!(
                    diagnostics,
                    "failed to load {}: {err}; using domain name unconverted",
                    library_path.display()
                );
                return raw.to_owned();
            }
        };
        debug!(path = %library_path.display(), "loaded IDN conversion library");

        let to_ascii = match unsafe { library.get::<IdnaToAsciiLz>(IDN_ENTRY_POINT) } {
            Ok(symbol) => symbol,
            Err(_) => {
                let _ = writeln!(
                    diagnostics,
                    "{} has no idna_to_ascii_lz entry point; using domain name unconverted",
                    library_path.display()
                );
                return raw.to_owned();
            }
        };

        let Ok(input) = CString::new(raw) else {
            let _ = writeln!(
                diagnostics,
                "domain name contains an interior NUL; using it unconverted"
            );
            return raw.to_owned();
        };

        let mut output: *mut c_char = ptr::null_mut();
        let status = unsafe { to_ascii(input.as_ptr(), &mut output, 0) };
        if status != IDNA_SUCCESS || output.is_null() {
            let _ = writeln!(
                diagnostics,
                "idna_to_ascii_lz returned status {status}; using domain name unconverted"
            );
            return raw.to_owned();
        }

        // The entry point hands back a malloc'd buffer we own.
        let ascii = unsafe { CStr::from_ptr(output) }
            .to_string_lossy()
            .into_owned();
        unsafe { libc::free(output.cast()) };
        ascii
    }

    /// First directory with a valid versioned candidate wins.
    fn locate_library(&self) -> Option<PathBuf> {
        self.search_dirs
            .iter()
            .find_map(|dir| libfind::find_newest_versioned(dir, IDN_LIBRARY_STEM))
    }
}
