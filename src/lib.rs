//! archstrap library
//!
//! Core functionality for provisioning a block device into a bootable Arch
//! Linux root filesystem: plan loading, live device inspection, the
//! destructive plan executor, mount orchestration, and the bootstrap
//! wrappers around arch-install-scripts.

pub mod block;
pub mod bootstrap;
pub mod cli;
pub mod clock;
pub mod error;
pub mod executor;
pub mod hardware;
pub mod mount;
pub mod plan;
pub mod role;
pub mod sanity;
pub mod tools;

// Re-export the main types for convenience
pub use block::{DeviceSnapshot, PartitionSnapshot, inspect};
pub use error::{InstallerError, Result};
pub use executor::{Confirmation, ExecContext, Stage, StdinConfirmation, execute, provision_device};
pub use hardware::FirmwareMode;
pub use mount::{INSTALL_PREFIX, MountEntry, MountMap, mount_tree};
pub use plan::{PartitionSpec, load_plan, parse_plan};
pub use role::{ROLE_TABLE, Role, RoleMapping};
pub use tools::{SystemCommands, ToolOutput, Tooling};
