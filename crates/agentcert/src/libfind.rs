//! Versioned shared-library lookup.
//!
//! Shared libraries installed as `libfoo.so.<N>` carry their ABI revision in
//! a numeric filename suffix. Resolution admits only candidates whose suffix
//! parses as a non-negative base-10 integer, orders them by that value (not
//! lexically, so `lib.so.10` beats `lib.so.3`), and picks the newest.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Find the highest-versioned `<stem><N>` file in `dir`.
///
/// `stem` includes everything up to the version digits, e.g. `libidn.so.`.
/// Returns `None` when the directory is unreadable or holds no valid
/// candidate; an unresolved library is an absent optional capability, not an
/// error.
pub fn find_newest_versioned(dir: &Path, stem: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;

    // Keyed by parsed suffix so ordering is numeric by construction.
    let mut candidates: BTreeMap<u64, PathBuf> = BTreeMap::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(suffix) = name.strip_prefix(stem) else {
            continue;
        };
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(version) = suffix.parse::<u64>() else {
            continue;
        };
        candidates.insert(version, entry.path());
    }

    let found = candidates.into_iter().next_back().map(|(_, path)| path);
    if let Some(path) = &found {
        debug!(path = %path.display(), "resolved versioned library");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").expect("create file");
    }

    #[test]
    fn picks_highest_numeric_suffix_not_lexical() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "lib.so.3");
        touch(dir.path(), "lib.so.10");
        touch(dir.path(), "lib.so.x");

        let found = find_newest_versioned(dir.path(), "lib.so.");
        assert_eq!(found, Some(dir.path().join("lib.so.10")));
    }

    #[test]
    fn rejects_malformed_suffixes() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "lib.so.");
        touch(dir.path(), "lib.so.1a");
        touch(dir.path(), "lib.so.-2");
        touch(dir.path(), "lib.so.+3");

        assert_eq!(find_newest_versioned(dir.path(), "lib.so."), None);
    }

    #[test]
    fn ignores_unrelated_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "other.so.5");
        touch(dir.path(), "lib.so.2");

        let found = find_newest_versioned(dir.path(), "lib.so.");
        assert_eq!(found, Some(dir.path().join("lib.so.2")));
    }

    #[test]
    fn missing_directory_is_not_found() {
        assert_eq!(
            find_newest_versioned(Path::new("/nonexistent/libdir"), "lib.so."),
            None
        );
    }
}
