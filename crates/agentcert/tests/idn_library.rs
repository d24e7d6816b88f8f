//! Domain conversion through a present shared library.
//!
//! Builds a minimal shared object exposing `idna_to_ascii_lz` at test time
//! and resolves it through the normal search path, so the load, symbol
//! lookup, conversion call, and buffer release all run for real.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::Command;

use agentcert::DomainNameEncoder;

/// Stub conversion routine with the real entry-point contract: returns a
/// malloc'd ASCII label through `output` and a zero status.
const TO_ASCII_STUB: &str = r#"
#include <stdlib.h>
#include <string.h>

int idna_to_ascii_lz(const char *input, char **output, int flags) {
    (void)input;
    (void)flags;
    const char *converted = "xn--bcher-kva.example";
    *output = malloc(strlen(converted) + 1);
    if (*output == NULL) {
        return 1;
    }
    strcpy(*output, converted);
    return 0;
}
"#;

/// A loadable library that lacks the conversion entry point.
const NO_ENTRY_POINT_STUB: &str = "int unrelated_symbol(void) { return 0; }\n";

/// Stub that reports a conversion failure without producing output.
const FAILING_STUB: &str = r#"
int idna_to_ascii_lz(const char *input, char **output, int flags) {
    (void)input;
    (void)output;
    (void)flags;
    return 74;
}
"#;

/// Compile `source` into `dir/<name>` as a shared object. Returns false when
/// no C compiler is available on this host.
fn compile_cdylib(dir: &Path, name: &str, source: &str) -> bool {
    let c_path = dir.join("stub.c");
    fs::write(&c_path, source).expect("write stub source");
    let out_path = dir.join(name);

    let compilers = [std::env::var("CC").ok(), Some("cc".into()), Some("gcc".into()), Some("clang".into())];
    for compiler in compilers.into_iter().flatten() {
        let status = Command::new(&compiler)
            .args(["-shared", "-fPIC", "-o"])
            .arg(&out_path)
            .arg(&c_path)
            .status();
        if matches!(status, Ok(code) if code.success()) {
            return true;
        }
    }
    false
}

#[test]
fn present_library_converts_to_ascii() {
    let dir = tempfile::tempdir().expect("tempdir");
    if !compile_cdylib(dir.path(), "libidn.so.1", TO_ASCII_STUB) {
        eprintln!("no C compiler available; skipping");
        return;
    }

    let encoder = DomainNameEncoder::with_search_dirs(vec![dir.path().to_path_buf()]);
    let mut diagnostics = String::new();
    let converted = encoder.encode("bücher.example", &mut diagnostics);

    assert_eq!(converted, "xn--bcher-kva.example");
    assert!(converted.is_ascii(), "converted label must be pure ASCII");
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics}");
}

#[test]
fn newest_library_version_is_loaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    if !compile_cdylib(dir.path(), "libidn.so.12", TO_ASCII_STUB) {
        eprintln!("no C compiler available; skipping");
        return;
    }
    // A lower-versioned decoy that would fail to load.
    fs::write(dir.path().join("libidn.so.2"), b"not a library").expect("write decoy");

    let encoder = DomainNameEncoder::with_search_dirs(vec![dir.path().to_path_buf()]);
    let mut diagnostics = String::new();
    let converted = encoder.encode("bücher.example", &mut diagnostics);

    assert_eq!(converted, "xn--bcher-kva.example");
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics}");
}

#[test]
fn library_without_entry_point_falls_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    if !compile_cdylib(dir.path(), "libidn.so.1", NO_ENTRY_POINT_STUB) {
        eprintln!("no C compiler available; skipping");
        return;
    }

    let encoder = DomainNameEncoder::with_search_dirs(vec![dir.path().to_path_buf()]);
    let mut diagnostics = String::new();
    let converted = encoder.encode("bücher.example", &mut diagnostics);

    assert_eq!(converted, "bücher.example");
    assert!(
        diagnostics.contains("idna_to_ascii_lz"),
        "diagnostic must name the missing entry point: {diagnostics}"
    );
}

#[test]
fn conversion_error_status_falls_back_with_diagnostic() {
    let dir = tempfile::tempdir().expect("tempdir");
    if !compile_cdylib(dir.path(), "libidn.so.1", FAILING_STUB) {
        eprintln!("no C compiler available; skipping");
        return;
    }

    let encoder = DomainNameEncoder::with_search_dirs(vec![dir.path().to_path_buf()]);
    let mut diagnostics = String::new();
    let converted = encoder.encode("bücher.example", &mut diagnostics);

    assert_eq!(converted, "bücher.example");
    assert!(
        diagnostics.contains("status 74"),
        "diagnostic must carry the conversion status: {diagnostics}"
    );
}
