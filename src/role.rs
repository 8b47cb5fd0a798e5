//! Partition role classification
//!
//! Maps partition type identifiers to the closed set of roles the installer
//! understands. Two representations identify the same role: the short sgdisk
//! type code used at creation time (`0x8300`) and the long-form GUID that
//! lsblk reports back (`parttype`). `ROLE_TABLE` is the single mapping
//! between them; adding a role means adding a table row, not a new branch
//! in the plan executor.
//!
//! GUIDs per the Discoverable Partitions Specification:
//! <https://www.freedesktop.org/wiki/Specifications/DiscoverablePartitionsSpec/>

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Functional classification of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Linux swap: initialized with mkswap and enabled with swapon
    #[strum(serialize = "swap")]
    Swap,

    /// BIOS boot partition: left raw, consumed by the firmware loader
    #[strum(serialize = "bios-boot")]
    BiosBoot,

    /// Generic Linux data: formatted ext4 and eligible for mounting
    #[strum(serialize = "data")]
    Data,

    /// Anything else: reported and left untouched, never auto-formatted
    #[default]
    #[strum(serialize = "unknown")]
    Unknown,
}

/// One row of the role mapping: a role with both of its type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleMapping {
    pub role: Role,
    /// Long-form partition type GUID as reported by lsblk (lowercase)
    pub guid: &'static str,
    /// Short sgdisk type code used at partition-creation time
    pub type_code: u16,
}

/// The recognized partition types. Everything else classifies as `Unknown`.
pub const ROLE_TABLE: &[RoleMapping] = &[
    RoleMapping {
        role: Role::Swap,
        guid: "0657fd6d-a4ab-43c4-84e5-0933c84b4f4f",
        type_code: 0x8200,
    },
    RoleMapping {
        role: Role::BiosBoot,
        guid: "21686148-6449-6e6f-744e-656564454649",
        type_code: 0xef02,
    },
    RoleMapping {
        role: Role::Data,
        guid: "0fc63daf-8483-4772-8e79-3d69d8477de4",
        type_code: 0x8300,
    },
];

impl Role {
    /// Classify a long-form partition type GUID.
    ///
    /// Total over all inputs: unrecognized or empty GUIDs map to `Unknown`,
    /// never an error. Comparison is case-insensitive since lsblk's casing
    /// has varied across util-linux releases.
    pub fn from_guid(guid: &str) -> Self {
        ROLE_TABLE
            .iter()
            .find(|m| m.guid.eq_ignore_ascii_case(guid))
            .map(|m| m.role)
            .unwrap_or(Role::Unknown)
    }

    /// Classify a short sgdisk type code.
    pub fn from_type_code(code: u16) -> Self {
        ROLE_TABLE
            .iter()
            .find(|m| m.type_code == code)
            .map(|m| m.role)
            .unwrap_or(Role::Unknown)
    }
}
