//! Mount orchestration
//!
//! Builds the filesystem tree the bootstrap stage installs into. Mount
//! order matters: the root partition must be mounted before `boot`, since
//! the boot mountpoint is a directory under the root.
//!
//! Scan rules over the partition list, in physical (= plan) order:
//!   - root: the *last* data-role partition (reverse scan)
//!   - boot: the *first* data-role partition (forward scan)
//! Swap and BIOS-boot partitions are skipped by both scans. When both scans
//! land on the same partition (a plan with a single data partition), the
//! boot mount is skipped with a warning rather than double-mounting.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::block;
use crate::error::{InstallerError, Result};
use crate::role::Role;
use crate::tools::Tooling;

/// Where the new system's root filesystem is assembled.
pub const INSTALL_PREFIX: &str = "/mnt/installer";

/// One performed mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Directory the partition was mounted on
    pub target: PathBuf,
    /// Partition device path (e.g. `/dev/sda2`)
    pub device: String,
}

/// Ordered record of the mounts performed, root first. This is the contract
/// handed to the bootstrap stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountMap {
    pub entries: Vec<MountEntry>,
}

impl MountMap {
    /// The root mount, if one was performed.
    pub fn root(&self) -> Option<&MountEntry> {
        self.entries.first()
    }
}

impl fmt::Display for MountMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{} -> {}", entry.target.display(), entry.device)?;
        }
        Ok(())
    }
}

/// Unmount every mounted partition on `device` (skipping swap), then the
/// device itself if it is mounted. Shared by the plan executor's
/// unmount stage and the mount orchestrator.
pub fn unmount_all(tools: &dyn Tooling, device: &str) -> Result<()> {
    let snapshot = block::inspect(tools, device)?;

    for child in &snapshot.children {
        if child.role() == Role::Swap {
            continue;
        }
        if let Some(mountpoint) = &child.mountpoint {
            info!("Unmounting partition {mountpoint}");
            tools.umount(mountpoint)?;
        }
    }

    if let Some(mountpoint) = &snapshot.mountpoint {
        info!("Unmounting {mountpoint}");
        tools.umount(mountpoint)?;
    }
    Ok(())
}

/// Mount the device's data partitions under `prefix` and report the result.
///
/// Unmounts any existing mounts first, then mounts root and boot per the
/// module-level scan rules. Fails if the prefix cannot be created, is not a
/// directory, no data-role partition exists, or any mount call fails.
pub fn mount_tree(tools: &dyn Tooling, device: &str, prefix: &Path) -> Result<MountMap> {
    unmount_all(tools, device)?;

    let snapshot = block::inspect(tools, device)?;
    if !snapshot.has_children() {
        return Err(InstallerError::state_inconsistency(format!(
            "no partitions found on {device}"
        )));
    }

    fs::create_dir_all(prefix)?;
    if !prefix.is_dir() {
        return Err(InstallerError::validation(format!(
            "not a directory: {}",
            prefix.display()
        )));
    }

    info!("Mounting partitions..");
    let mut map = MountMap::default();

    // Root: last data partition. Must exist before /boot.
    let root = snapshot
        .children
        .iter()
        .rev()
        .find(|child| child.role() == Role::Data)
        .ok_or_else(|| {
            InstallerError::precondition(format!(
                "no data-role partition on {device} to mount as root"
            ))
        })?;

    let root_dev = root.device_path();
    info!("Mounting {} at {}", root_dev, prefix.display());
    tools.mount(&root_dev, &prefix.to_string_lossy())?;
    map.entries.push(MountEntry {
        target: prefix.to_path_buf(),
        device: root_dev,
    });

    // Boot: first data partition.
    if let Some(boot) = snapshot
        .children
        .iter()
        .find(|child| child.role() == Role::Data)
    {
        if boot.name == root.name {
            warn!(
                "Only one data partition ({}); skipping separate /boot mount",
                boot.name
            );
        } else {
            let boot_dir = prefix.join("boot");
            fs::create_dir_all(&boot_dir)?;
            let boot_dev = boot.device_path();
            info!("Mounting {} at {}", boot_dev, boot_dir.display());
            tools.mount(&boot_dev, &boot_dir.to_string_lossy())?;
            map.entries.push(MountEntry {
                target: boot_dir,
                device: boot_dev,
            });
        }
    }

    // Report ground truth, not our own bookkeeping.
    let after = block::inspect(tools, device)?;
    for child in &after.children {
        debug!(
            "{}: mountpoint={}",
            child.name,
            child.mountpoint.as_deref().unwrap_or("-")
        );
    }

    Ok(map)
}
