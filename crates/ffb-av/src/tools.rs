//! Encoder binary discovery.
//!
//! A configured path is authoritative: if it does not exist the engine is
//! disabled rather than silently falling back to whatever `PATH` offers.
//! Without a configured path, [`which::which`] locates `ffmpeg`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Program name searched on `PATH` when no path is configured.
pub const DEFAULT_BINARY: &str = "ffmpeg";

/// Availability information for the encoder binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output, if available.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Resolve the encoder binary.
///
/// # Errors
///
/// [`ffb_core::Error::BinaryNotFound`] if the configured path does not exist,
/// or if nothing is configured and `ffmpeg` is not on `PATH`.
pub fn resolve_binary(configured: Option<&Path>) -> ffb_core::Result<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(ffb_core::Error::binary_not_found(path.display())),
        None => which::which(DEFAULT_BINARY)
            .map_err(|_| ffb_core::Error::binary_not_found(DEFAULT_BINARY)),
    }
}

/// Report whether the encoder is usable, and which version it is.
pub fn check_binary(configured: Option<&Path>) -> ToolInfo {
    match resolve_binary(configured) {
        Ok(path) => ToolInfo {
            name: DEFAULT_BINARY.to_string(),
            available: true,
            version: detect_version(&path),
            path: Some(path),
        },
        Err(_) => ToolInfo {
            name: DEFAULT_BINARY.to_string(),
            available: false,
            version: None,
            path: configured.map(Path::to_path_buf),
        },
    }
}

/// Run `<binary> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
