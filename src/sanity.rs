//! Pre-flight sanity checks for the runtime environment
//!
//! Verifies the live environment before any destructive subcommand runs:
//! - Required external binaries are present on PATH
//! - Running with root privileges (EUID 0)
//!
//! If any check fails, the program reports what is missing and exits with
//! code 1 before anything touches the device.

use std::process::Command;

use log::debug;

/// Binaries the partition and mount subcommands shell out to.
pub const PROVISION_BINARIES: &[&str] = &[
    "lsblk",     // block device inspection (util-linux)
    "sgdisk",    // GPT partitioning (gdisk package)
    "wipefs",    // signature erasure (util-linux)
    "partprobe", // partition table re-probe (parted)
    "fdisk",     // final listing (util-linux)
    "mkfs.ext4", // filesystem creation (e2fsprogs)
    "mkswap",    // swap initialization (util-linux)
    "swapon",    // swap activation (util-linux)
    "mount",     // filesystem mounting (util-linux)
    "umount",    // filesystem unmounting (util-linux)
];

/// Additional binaries the bootstrap subcommand needs.
pub const BOOTSTRAP_BINARIES: &[&str] = &[
    "rankmirrors", // mirror ranking (pacman-contrib)
    "pacstrap",    // base system installation (arch-install-scripts)
    "genfstab",    // fstab generation (arch-install-scripts)
    "arch-chroot", // chroot entry (arch-install-scripts)
];

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }
}

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Verify the environment for a subcommand that needs `binaries`.
pub fn verify_environment(binaries: &[&str]) -> SanityCheckResult {
    let mut missing = Vec::new();
    for binary in binaries {
        if binary_exists(binary) {
            debug!("Found binary {binary}");
        } else {
            missing.push((*binary).to_string());
        }
    }

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Print the failure to stderr and exit 1. Called before logging matters,
/// so plain stderr output is fine.
pub fn print_error_and_exit(result: &SanityCheckResult) -> ! {
    if !result.is_root {
        eprintln!("error: root privileges required");
        eprintln!("       partitioning and bootstrapping need EUID 0; run with sudo");
    }
    if !result.missing_binaries.is_empty() {
        eprintln!("error: missing required binaries:");
        for binary in &result.missing_binaries {
            eprintln!("       {binary}");
        }
    }
    std::process::exit(1);
}
