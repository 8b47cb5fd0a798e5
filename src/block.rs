//! Live block device inspection
//!
//! Deserializes the `lsblk -O -J` view of one device and its child
//! partitions. A snapshot is a point-in-time read: it is invalidated by any
//! partition-table change, so callers re-inspect after every mutating stage
//! instead of patching an old snapshot.

use log::debug;
use serde::Deserialize;

use crate::error::{InstallerError, Result};
use crate::role::Role;
use crate::tools::Tooling;

/// Top-level lsblk JSON document.
#[derive(Debug, Clone, Deserialize)]
struct LsblkReport {
    #[serde(default)]
    blockdevices: Vec<DeviceSnapshot>,
}

/// Point-in-time view of one block device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSnapshot {
    /// Kernel device name (e.g. `sda`)
    pub name: String,
    /// lsblk `type` column (`disk`, `rom`, ...)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// lsblk `group` column (`disk`, `optical`, ...)
    #[serde(default)]
    pub group: Option<String>,
    /// Where the device itself is mounted, if anywhere
    #[serde(default)]
    pub mountpoint: Option<String>,
    /// Child partitions, in on-disk order. Empty means no partition table.
    #[serde(default)]
    pub children: Vec<PartitionSnapshot>,
}

impl DeviceSnapshot {
    /// Whether the device currently carries any partitions.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Point-in-time view of one partition. Derived data: owned by the snapshot
/// that produced it, never mutated, only replaced by the next inspection.
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionSnapshot {
    /// Kernel device name (e.g. `sda1`)
    pub name: String,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub partlabel: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    /// Long-form partition type GUID
    #[serde(default)]
    pub parttype: Option<String>,
}

impl PartitionSnapshot {
    /// Absolute device path for this partition.
    pub fn device_path(&self) -> String {
        format!("/dev/{}", self.name)
    }

    /// Role derived from the partition type GUID.
    pub fn role(&self) -> Role {
        Role::from_guid(self.parttype.as_deref().unwrap_or(""))
    }
}

/// Query the live kernel view of one block device.
///
/// Pure read, no side effects. Fails with `DeviceNotFound` when lsblk
/// reports zero devices and `AmbiguousDevice` when it reports more than one
/// (should be unreachable for a single path, but checked).
pub fn inspect(tools: &dyn Tooling, device: &str) -> Result<DeviceSnapshot> {
    let json = tools.lsblk_json(device)?;
    let report: LsblkReport = serde_json::from_str(&json)?;

    let mut devices = report.blockdevices;
    match devices.len() {
        0 => Err(InstallerError::DeviceNotFound(device.to_string())),
        1 => {
            let snapshot = devices.remove(0);
            debug!(
                "Inspected {}: {} children",
                snapshot.name,
                snapshot.children.len()
            );
            Ok(snapshot)
        }
        count => Err(InstallerError::AmbiguousDevice {
            device: device.to_string(),
            count,
        }),
    }
}
