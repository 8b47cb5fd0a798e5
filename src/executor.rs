//! Plan executor: the destructive provisioning state machine
//!
//! Drives a block device through the ordered sequence of operations that
//! turns a partition plan into real partitions: precondition checks,
//! unmount-all, table wipe, creation, per-partition wipe, role-based
//! formatting, and a final verification listing.
//!
//! # Design
//!
//! - Stages run in strict forward order; the first failure aborts the run.
//!   Partition-table operations on a device about to be wiped are
//!   irreversible, so there is no rollback; a clean abort with full
//!   diagnostics beats speculative repair.
//! - Stages are an explicit ordered table of functions over a shared
//!   [`ExecContext`], so each stage is independently testable with a fake
//!   tool layer.
//! - Every stage that needs device state re-inspects it. Snapshots are never
//!   reused across a mutating boundary.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

use log::{debug, error, info};

use crate::block;
use crate::error::{InstallerError, Result};
use crate::hardware::FirmwareMode;
use crate::plan::{self, PartitionSpec};
use crate::role::Role;
use crate::tools::Tooling;

/// Capability to ask the operator a yes/no question.
///
/// Injected so the executor's logic is testable without a terminal.
pub trait Confirmation {
    /// Present `prompt` and report whether the operator answered yes.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Production [`Confirmation`]: one line from stdin, `y` (case-insensitive)
/// means yes, anything else means no.
#[derive(Debug, Default)]
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().eq_ignore_ascii_case("y"))
    }
}

/// Provisioning stages in execution order. No backward transitions; any
/// stage failure is fatal for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Media-type, firmware and confirmation gates; nothing mutated yet
    Preconditions,
    /// Unmount every mounted partition (and the device itself)
    UnmountAll,
    /// Erase signatures and (re)initialize an empty GPT
    WipeTable,
    /// Create partitions from the plan and confirm the kernel sees them
    CreatePartitions,
    /// Defensive signature wipe inside each newly carved extent
    WipePartitions,
    /// Format each partition according to its role
    FormatPartitions,
    /// Final re-probe and listing
    Verify,
}

impl Stage {
    /// Human-readable description of this stage.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Preconditions => "Checking preconditions",
            Self::UnmountAll => "Unmounting existing mounts",
            Self::WipeTable => "Wiping partition table",
            Self::CreatePartitions => "Generating partitions",
            Self::WipePartitions => "Wiping partitions",
            Self::FormatPartitions => "Generating filesystems",
            Self::Verify => "Verifying result",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Shared context the stage functions operate on.
pub struct ExecContext<'a> {
    /// Absolute device path (e.g. `/dev/sda`)
    pub device: &'a str,
    /// The validated partition plan, in layout order
    pub plan: &'a [PartitionSpec],
    /// External tool layer
    pub tools: &'a dyn Tooling,
    /// Operator confirmation capability
    pub confirm: &'a mut dyn Confirmation,
    /// Firmware mode of the running system
    pub firmware: FirmwareMode,
}

type StageFn = fn(&mut ExecContext) -> Result<()>;

/// The state machine: stages in execution order.
const STAGES: &[(Stage, StageFn)] = &[
    (Stage::Preconditions, preconditions),
    (Stage::UnmountAll, unmount_all),
    (Stage::WipeTable, wipe_table),
    (Stage::CreatePartitions, create_partitions),
    (Stage::WipePartitions, wipe_partitions),
    (Stage::FormatPartitions, format_partitions),
    (Stage::Verify, verify),
];

/// Load the plan from `plan_path`, then run the full state machine.
///
/// Plan validation runs to completion before any device access: a malformed
/// or insufficient plan never triggers so much as an inspection.
pub fn provision_device(
    device: &str,
    plan_path: &Path,
    tools: &dyn Tooling,
    confirm: &mut dyn Confirmation,
    firmware: FirmwareMode,
) -> Result<()> {
    let plan = plan::load_plan(plan_path)?;
    let mut ctx = ExecContext { device, plan: &plan, tools, confirm, firmware };
    execute(&mut ctx)
}

/// Run every stage in order over an already-validated context.
pub fn execute(ctx: &mut ExecContext) -> Result<()> {
    for (stage, run) in STAGES {
        info!("{}..", stage.description());
        run(ctx)?;
    }
    info!("Done.");
    Ok(())
}

/// Stage 1: reject unsuitable media, require a BIOS boot partition on
/// non-EFI systems, and get explicit operator confirmation before anything
/// destructive happens.
fn preconditions(ctx: &mut ExecContext) -> Result<()> {
    let snapshot = block::inspect(ctx.tools, ctx.device)?;

    if snapshot.group.as_deref() == Some("optical") {
        return Err(InstallerError::precondition(format!(
            "block device {} group is optical",
            snapshot.name
        )));
    }
    if snapshot.kind.as_deref() == Some("rom") {
        return Err(InstallerError::precondition(format!(
            "block device {} type is ROM",
            snapshot.name
        )));
    }

    let bios_partition_listed = ctx.plan.iter().any(|spec| spec.role() == Role::BiosBoot);
    if !ctx.firmware.is_uefi() && !bios_partition_listed {
        return Err(InstallerError::precondition(
            "system is not EFI enabled and no BIOS boot partition is listed in the partition file",
        ));
    }

    if snapshot.has_children() {
        info!(
            "Block device {} has children. These will be deleted:",
            snapshot.name
        );
        for child in &snapshot.children {
            info!(
                "    {} fstype={} label={} partlabel={} size={} mountpoint={}",
                child.name,
                child.fstype.as_deref().unwrap_or("-"),
                child.label.as_deref().unwrap_or("-"),
                child.partlabel.as_deref().unwrap_or("-"),
                child.size.as_deref().unwrap_or("-"),
                child.mountpoint.as_deref().unwrap_or("-"),
            );
        }
    }

    let prompt = format!("Delete all contents from {}? y/n: ", ctx.device);
    if !ctx.confirm.confirm(&prompt)? {
        info!("Aborted.");
        return Err(InstallerError::Aborted);
    }
    Ok(())
}

/// Stage 2: unmount every mounted partition except swap, then the device
/// itself if mounted. A busy mount fails the run; the operator resolves it
/// manually.
fn unmount_all(ctx: &mut ExecContext) -> Result<()> {
    crate::mount::unmount_all(ctx.tools, ctx.device)
}

/// Stage 3: erase partition signatures, erase filesystem signatures, then
/// initialize an empty GPT. Three separate irreversible calls, each fatal.
fn wipe_table(ctx: &mut ExecContext) -> Result<()> {
    ctx.tools.sgdisk(ctx.device, &["--zap-all".to_string()])?;
    ctx.tools.wipefs_all(ctx.device)?;
    ctx.tools
        .sgdisk(ctx.device, &["--clear".to_string(), "--mbrtogpt".to_string()])?;
    Ok(())
}

/// Stages 4–5: create partitions in plan order (index 0 = next automatic
/// index, offset 0 = first free), re-probe, and confirm the kernel sees a
/// partition table.
fn create_partitions(ctx: &mut ExecContext) -> Result<()> {
    for spec in ctx.plan {
        let code = spec.type_code_hex();
        info!("Generating partition {} {}", spec.name, code);
        let args = vec![
            "--new".to_string(),
            format!("0:0:{}", spec.size),
            "--typecode".to_string(),
            format!("0:{code}"),
            "--change-name".to_string(),
            format!("0:{}", spec.name),
        ];
        ctx.tools.sgdisk(ctx.device, &args)?;
    }

    info!("Informing OS of partition changes");
    let probe = ctx.tools.partprobe(ctx.device)?;
    debug!("{}", probe.stdout);

    let snapshot = block::inspect(ctx.tools, ctx.device)?;
    if !snapshot.has_children() {
        return Err(InstallerError::state_inconsistency(
            "partition generation failed: no partitions present after table creation",
        ));
    }
    Ok(())
}

/// Stages 6–7: independently erase signatures inside every new partition
/// (guards against stale signatures in newly carved extents), then re-probe.
fn wipe_partitions(ctx: &mut ExecContext) -> Result<()> {
    let snapshot = block::inspect(ctx.tools, ctx.device)?;

    for child in &snapshot.children {
        let dev = child.device_path();
        info!("  Wiping {dev}");
        ctx.tools.sgdisk(&dev, &["--zap-all".to_string()])?;
        ctx.tools.wipefs_all(&dev)?;
    }

    info!("Informing OS of partition changes");
    let probe = ctx.tools.partprobe(ctx.device)?;
    debug!("{}", probe.stdout);
    Ok(())
}

/// Stage 8: format each partition by role. Unknown roles are reported and
/// skipped: the operator formats them manually; they never fail the run.
fn format_partitions(ctx: &mut ExecContext) -> Result<()> {
    let snapshot = block::inspect(ctx.tools, ctx.device)?;

    for child in &snapshot.children {
        let dev = child.device_path();
        info!("  Partition {dev}");
        match child.role() {
            Role::Swap => {
                info!("  Enabling swap on {}", child.name);
                ctx.tools.mkswap(&dev)?;
                ctx.tools.swapon(&dev)?;
            }
            Role::BiosBoot => {
                debug!("  Leaving {} raw for the firmware loader", child.name);
            }
            Role::Data => {
                info!("  Formatting ext4 @ {}", child.name);
                ctx.tools.mkfs_ext4(&dev)?;
            }
            Role::Unknown => {
                error!(
                    "  Unknown type: {} {} {}. Format this manually.",
                    child.name,
                    child.partlabel.as_deref().unwrap_or("-"),
                    child.parttype.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}

/// Stage 9: final re-probe and listing as terminal success confirmation.
fn verify(ctx: &mut ExecContext) -> Result<()> {
    info!("Informing OS of partition changes");
    let probe = ctx.tools.partprobe(ctx.device)?;
    debug!("{}", probe.stdout);

    let snapshot = block::inspect(ctx.tools, ctx.device)?;
    if !snapshot.has_children() {
        return Err(InstallerError::state_inconsistency(
            "no partitions present after formatting",
        ));
    }
    info!(
        "Device {} carries {} partitions",
        snapshot.name,
        snapshot.children.len()
    );

    let listing = ctx.tools.fdisk_list(ctx.device)?;
    info!("{}", listing.stdout);
    Ok(())
}
