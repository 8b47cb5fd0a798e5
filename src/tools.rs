//! External tool invocation layer
//!
//! Every command that touches the device goes through the [`Tooling`] trait.
//! The plan executor and mount orchestrator only see this trait, so tests
//! substitute a recording fake and exercise the full state machine without a
//! real disk. The production implementation shells out synchronously with
//! captured output; a non-zero exit becomes `ExternalTool` with the tool's
//! stderr attached for diagnosis.

use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::{InstallerError, Result};

/// Bound on the lsblk inspection query. Table and format operations are
/// deliberately unbounded (large mkfs durations are normal).
pub const INSPECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured output from a finished external command.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
}

/// The commands the provisioning engine needs from the outside world.
///
/// Mirrors the fixed argument contracts of the underlying tools; each method
/// either succeeds with captured output or fails the run.
pub trait Tooling {
    /// `lsblk -O -J <device>`: raw JSON, bounded by [`INSPECT_TIMEOUT`].
    fn lsblk_json(&self, device: &str) -> Result<String>;

    /// `sgdisk <args> <device>`: table-level and per-partition operations.
    fn sgdisk(&self, device: &str, args: &[String]) -> Result<ToolOutput>;

    /// `wipefs -a <device>`: erase all filesystem signatures.
    fn wipefs_all(&self, device: &str) -> Result<ToolOutput>;

    /// `partprobe <device>`: inform the kernel of partition table changes.
    fn partprobe(&self, device: &str) -> Result<ToolOutput>;

    /// `fdisk --list <device>`: human-readable listing for the final report.
    fn fdisk_list(&self, device: &str) -> Result<ToolOutput>;

    /// `mkswap <device>`
    fn mkswap(&self, device: &str) -> Result<ToolOutput>;

    /// `swapon <device>`
    fn swapon(&self, device: &str) -> Result<ToolOutput>;

    /// `mkfs.ext4 <device>`
    fn mkfs_ext4(&self, device: &str) -> Result<ToolOutput>;

    /// `mount <device> <target>`
    fn mount(&self, device: &str, target: &str) -> Result<ToolOutput>;

    /// `umount <target>`: target may be a mountpoint or a device path.
    fn umount(&self, target: &str) -> Result<ToolOutput>;
}

/// Production [`Tooling`]: spawns the real commands.
#[derive(Debug, Default)]
pub struct SystemCommands;

impl SystemCommands {
    pub fn new() -> Self {
        Self
    }

    /// Run a command to completion with captured output.
    ///
    /// Logs the exact invocation at debug level. Non-zero exit is an error
    /// carrying the captured stderr.
    fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program).args(args).output()?;
        into_tool_output(program, args, output)
    }
}

fn into_tool_output(
    program: &str,
    args: &[&str],
    output: std::process::Output,
) -> Result<ToolOutput> {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code();

    if output.status.success() {
        Ok(ToolOutput { stdout, stderr, exit_code })
    } else {
        Err(InstallerError::ExternalTool {
            command: format!("{} {}", program, args.join(" ")),
            code: exit_code.unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        })
    }
}

impl Tooling for SystemCommands {
    fn lsblk_json(&self, device: &str) -> Result<String> {
        debug!("Running lsblk -O -J {device}");

        // lsblk can hang on misbehaving hardware; run it on a worker thread
        // and bound the wait. An expired timeout abandons the worker, which
        // is fine since the run is aborting anyway.
        let dev = device.to_string();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = Command::new("lsblk").args(["-O", "-J", &dev]).output();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(INSPECT_TIMEOUT) {
            Ok(result) => {
                let output = result?;
                let out = into_tool_output("lsblk", &["-O", "-J", device], output)?;
                Ok(out.stdout)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Err(InstallerError::InspectionTimeout {
                device: device.to_string(),
                seconds: INSPECT_TIMEOUT.as_secs(),
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(InstallerError::state_inconsistency(
                format!("lsblk worker for {device} exited without a result"),
            )),
        }
    }

    fn sgdisk(&self, device: &str, args: &[String]) -> Result<ToolOutput> {
        let mut argv: Vec<&str> = args.iter().map(String::as_str).collect();
        argv.push(device);
        self.run("sgdisk", &argv)
    }

    fn wipefs_all(&self, device: &str) -> Result<ToolOutput> {
        self.run("wipefs", &["-a", device])
    }

    fn partprobe(&self, device: &str) -> Result<ToolOutput> {
        self.run("partprobe", &[device])
    }

    fn fdisk_list(&self, device: &str) -> Result<ToolOutput> {
        self.run("fdisk", &["--list", device])
    }

    fn mkswap(&self, device: &str) -> Result<ToolOutput> {
        self.run("mkswap", &[device])
    }

    fn swapon(&self, device: &str) -> Result<ToolOutput> {
        self.run("swapon", &[device])
    }

    fn mkfs_ext4(&self, device: &str) -> Result<ToolOutput> {
        self.run("mkfs.ext4", &[device])
    }

    fn mount(&self, device: &str, target: &str) -> Result<ToolOutput> {
        self.run("mount", &[device, target])
    }

    fn umount(&self, target: &str) -> Result<ToolOutput> {
        self.run("umount", &[target])
    }
}
