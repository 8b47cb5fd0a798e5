use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};

use crate::error::{InstallerError, Result};

/// archstrap - provisions a block device into a bootable Arch Linux system
#[derive(Parser)]
#[command(name = "archstrap")]
#[command(about = "Wipes, partitions, mounts and bootstraps a target block device")]
#[command(version)]
pub struct Cli {
    /// Be verbose. -vv.. Be more verbose.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wipe the device and create partitions from a partitions file
    Partition {
        /// Target device (for example /dev/sda)
        #[arg(short, long)]
        device: PathBuf,

        /// Partitions JSON file. These are created on the target device.
        #[arg(short, long, default_value = "partitions.json")]
        partitions: PathBuf,
    },
    /// Mount the device's partitions under the install prefix
    Mount {
        /// Target device (for example /dev/sda)
        #[arg(short, long)]
        device: PathBuf,
    },
    /// Rank mirrors, install the base system, write fstab and enter a chroot
    Bootstrap,
    /// List network adapters (excluding loopback)
    Network,
    /// Wait for NTP clock synchronization
    Clock,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// Resolve a `--device` argument to a canonical path and verify it is a
/// real block device. Rejected paths never reach the executor.
pub fn resolve_block_device(path: &Path) -> Result<PathBuf> {
    use std::os::unix::fs::FileTypeExt;

    let resolved = path.canonicalize().map_err(|_| {
        InstallerError::validation(format!("'{}' does not exist", path.display()))
    })?;

    let metadata = std::fs::metadata(&resolved)?;
    if !metadata.file_type().is_block_device() {
        return Err(InstallerError::validation(format!(
            "'{}' is not a block device",
            path.display()
        )));
    }
    Ok(resolved)
}
