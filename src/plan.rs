//! Partition plan loading and validation
//!
//! The plan is the user-declared ordered list of partitions to create, read
//! from a JSON file of the form:
//!
//! ```json
//! {
//!   "partitions": [
//!     { "name": "boot", "type": "ef02", "size": "+512M" },
//!     { "name": "root", "type": "8300", "size": "0" }
//!   ]
//! }
//! ```
//!
//! The list order IS the physical layout order: the executor lays partitions
//! out starting from the first free offset, in plan order. Validation runs to
//! completion before anything touches the device.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{InstallerError, Result};
use crate::role::Role;

/// One desired partition, as declared by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    /// Partition label, set via `sgdisk --change-name`
    pub name: String,
    /// Short sgdisk type code (e.g. 0x8300), parsed from hex text
    pub type_id: u16,
    /// sgdisk size/offset expression (`+512M`, `0` for rest of disk, ...)
    pub size: String,
}

impl PartitionSpec {
    /// The type code rendered the way sgdisk expects it: 4 lowercase hex digits.
    pub fn type_code_hex(&self) -> String {
        format!("{:04x}", self.type_id)
    }

    /// Role this partition will have once created.
    pub fn role(&self) -> Role {
        Role::from_type_code(self.type_id)
    }
}

/// Raw document shape. All fields optional so that missing keys surface as
/// our own validation errors instead of serde's.
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    partitions: Option<Vec<RawSpec>>,
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    type_code: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

/// Load and validate a partition plan from a file.
pub fn load_plan(path: &Path) -> Result<Vec<PartitionSpec>> {
    debug!("Reading partitions file {}", path.display());
    let text = fs::read_to_string(path)?;
    parse_plan(&text)
}

/// Parse and validate a partition plan from JSON text.
///
/// Errors, in check order: `EmptyPlan` for a blank document, `MalformedPlan`
/// for unparseable JSON or a missing `partitions` key, `MissingField` for an
/// entry lacking `name`/`type`/`size`, `MalformedPlan` for a type code that
/// is not hexadecimal, `InsufficientPartitions` for fewer than two entries.
pub fn parse_plan(text: &str) -> Result<Vec<PartitionSpec>> {
    if text.trim().is_empty() {
        return Err(InstallerError::EmptyPlan);
    }

    let raw: RawPlan = serde_json::from_str(text)
        .map_err(|e| InstallerError::malformed_plan(e.to_string()))?;

    let entries = raw
        .partitions
        .ok_or_else(|| InstallerError::malformed_plan("no 'partitions' key found"))?;

    let mut plan = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let name = match entry.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            Some(_) => {
                return Err(InstallerError::validation(format!(
                    "partition entry {index} has an empty name"
                )));
            }
            None => return Err(InstallerError::MissingField { index, field: "name" }),
        };

        let type_text = entry
            .type_code
            .as_deref()
            .ok_or(InstallerError::MissingField { index, field: "type" })?;

        let type_id = parse_type_code(type_text).ok_or_else(|| {
            InstallerError::malformed_plan(format!(
                "partition '{name}' has invalid type code '{type_text}'"
            ))
        })?;

        let size = match entry.size.as_deref() {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            Some(_) => {
                return Err(InstallerError::validation(format!(
                    "partition '{name}' has an empty size expression"
                )));
            }
            None => return Err(InstallerError::MissingField { index, field: "size" }),
        };

        plan.push(PartitionSpec { name, type_id, size });
    }

    if plan.len() < 2 {
        return Err(InstallerError::InsufficientPartitions(plan.len()));
    }

    debug!("Loaded plan with {} partitions", plan.len());
    Ok(plan)
}

/// Parse a 16-bit type code from hex text, with or without a `0x` prefix.
fn parse_type_code(text: &str) -> Option<u16> {
    let digits = text
        .trim()
        .strip_prefix("0x")
        .or_else(|| text.trim().strip_prefix("0X"))
        .unwrap_or_else(|| text.trim());
    u16::from_str_radix(digits, 16).ok()
}
