//! Deterministic port derivation
//!
//! Every process that needs to reach the engine for a project computes the
//! same port from the project's canonical path, so no coordination file or
//! configuration is needed to find it. The hash must stay bit-compatible with
//! the engine's own implementation.

use std::path::Path;

use tracing::debug;

/// First port of the derived range
pub const PORT_BASE: u16 = 8765;

/// Number of ports in the derived range
pub const PORT_SPAN: u64 = 1000;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a over raw bytes
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Derive the engine port from a byte sequence
///
/// Always in `[PORT_BASE, PORT_BASE + PORT_SPAN - 1]`.
pub fn port_for_bytes(bytes: &[u8]) -> u16 {
    PORT_BASE + (fnv1a64(bytes) % PORT_SPAN) as u16
}

/// Derive the engine port for a directory
///
/// The path should already be canonical; this function hashes whatever bytes
/// it is given.
pub fn port_for_dir(dir: &Path) -> u16 {
    let port = port_for_bytes(&path_bytes(dir));
    debug!(?dir, port, "port_for_dir: derived");
    port
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().as_bytes().to_vec()
}
