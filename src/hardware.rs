//! Hardware environment detection
//!
//! Detects firmware mode (UEFI vs BIOS) and enumerates network adapters
//! using pure Rust. No shelling out; all detection reads sysfs directly.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

/// Detected firmware mode of the system.
///
/// Determined by checking for the existence of `/sys/firmware/efi/efivars`.
/// If the directory exists, the system booted in UEFI mode; otherwise it
/// booted in legacy BIOS mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareMode {
    /// UEFI firmware: GPT boots without a BIOS boot partition
    Uefi,
    /// Legacy BIOS firmware: GPT requires a BIOS boot partition
    Bios,
}

impl FirmwareMode {
    /// Returns true if the system booted in UEFI mode.
    pub fn is_uefi(self) -> bool {
        matches!(self, Self::Uefi)
    }

    /// Detect the firmware mode of the running system.
    pub fn detect() -> Self {
        detect_at(Path::new("/sys/firmware/efi/efivars"))
    }
}

fn detect_at(efivars: &Path) -> FirmwareMode {
    let mode = if efivars.is_dir() {
        FirmwareMode::Uefi
    } else {
        FirmwareMode::Bios
    };
    debug!("Firmware mode: {mode}");
    mode
}

impl fmt::Display for FirmwareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uefi => write!(f, "UEFI"),
            Self::Bios => write!(f, "BIOS"),
        }
    }
}

/// Enumerate network adapters, excluding loopback.
///
/// Reads `/sys/class/net` and returns the adapter names. An empty result is
/// an error: an installation cannot proceed without a way to reach a mirror.
pub fn network_adapters() -> Result<Vec<String>> {
    adapters_in(Path::new("/sys/class/net"))
}

fn adapters_in(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?;

    let mut adapters = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name == "lo" {
            continue;
        }
        adapters.push(name);
    }
    adapters.sort();

    if adapters.is_empty() {
        anyhow::bail!("no network adapters found");
    }
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_at_missing_dir_is_bios() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("efivars");
        assert_eq!(detect_at(&missing), FirmwareMode::Bios);
    }

    #[test]
    fn test_detect_at_present_dir_is_uefi() {
        let dir = tempfile::tempdir().unwrap();
        let efivars = dir.path().join("efivars");
        std::fs::create_dir(&efivars).unwrap();
        assert_eq!(detect_at(&efivars), FirmwareMode::Uefi);
    }

    #[test]
    fn test_adapters_skip_loopback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lo")).unwrap();
        std::fs::create_dir(dir.path().join("eth0")).unwrap();
        std::fs::create_dir(dir.path().join("wlan0")).unwrap();

        let adapters = adapters_in(dir.path()).unwrap();
        assert_eq!(adapters, vec!["eth0".to_string(), "wlan0".to_string()]);
    }

    #[test]
    fn test_adapters_only_loopback_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lo")).unwrap();
        assert!(adapters_in(dir.path()).is_err());
    }
}
