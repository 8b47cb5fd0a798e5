//! Shared fixtures for integration tests: a recording fake tool layer and a
//! scripted confirmation provider, so the full state machine runs without a
//! real disk or terminal.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::cell::RefCell;

use archstrap::error::{InstallerError, Result};
use archstrap::executor::Confirmation;
use archstrap::tools::{ToolOutput, Tooling};

/// Fake [`Tooling`] that records every invocation and serves canned lsblk
/// JSON. The served snapshot switches from `initial` to `after_create` the
/// first time a `sgdisk --new` call lands, mimicking the kernel's view of
/// the device changing under the tool layer.
pub struct FakeTools {
    current: RefCell<String>,
    after_create: Option<String>,
    calls: RefCell<Vec<String>>,
    /// Command prefix that should fail with a non-zero exit, if any.
    fail_command: Option<&'static str>,
}

impl FakeTools {
    pub fn new(initial: String) -> Self {
        Self {
            current: RefCell::new(initial),
            after_create: None,
            calls: RefCell::new(Vec::new()),
            fail_command: None,
        }
    }

    pub fn with_after_create(mut self, json: String) -> Self {
        self.after_create = Some(json);
        self
    }

    pub fn failing_on(mut self, command_prefix: &'static str) -> Self {
        self.fail_command = Some(command_prefix);
        self
    }

    /// Every recorded invocation, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Recorded invocations whose command line starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn invoke(&self, command: String) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(command.clone());
        if let Some(prefix) = self.fail_command {
            if command.starts_with(prefix) {
                return Err(InstallerError::ExternalTool {
                    command,
                    code: 1,
                    stderr: "injected failure".to_string(),
                });
            }
        }
        Ok(ToolOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }
}

impl Tooling for FakeTools {
    fn lsblk_json(&self, device: &str) -> Result<String> {
        self.invoke(format!("lsblk -O -J {device}"))?;
        Ok(self.current.borrow().clone())
    }

    fn sgdisk(&self, device: &str, args: &[String]) -> Result<ToolOutput> {
        let out = self.invoke(format!("sgdisk {} {device}", args.join(" ")))?;
        if args.iter().any(|arg| arg == "--new") {
            if let Some(after) = &self.after_create {
                *self.current.borrow_mut() = after.clone();
            }
        }
        Ok(out)
    }

    fn wipefs_all(&self, device: &str) -> Result<ToolOutput> {
        self.invoke(format!("wipefs -a {device}"))
    }

    fn partprobe(&self, device: &str) -> Result<ToolOutput> {
        self.invoke(format!("partprobe {device}"))
    }

    fn fdisk_list(&self, device: &str) -> Result<ToolOutput> {
        self.invoke(format!("fdisk --list {device}"))
    }

    fn mkswap(&self, device: &str) -> Result<ToolOutput> {
        self.invoke(format!("mkswap {device}"))
    }

    fn swapon(&self, device: &str) -> Result<ToolOutput> {
        self.invoke(format!("swapon {device}"))
    }

    fn mkfs_ext4(&self, device: &str) -> Result<ToolOutput> {
        self.invoke(format!("mkfs.ext4 {device}"))
    }

    fn mount(&self, device: &str, target: &str) -> Result<ToolOutput> {
        self.invoke(format!("mount {device} {target}"))
    }

    fn umount(&self, target: &str) -> Result<ToolOutput> {
        self.invoke(format!("umount {target}"))
    }
}

/// Scripted [`Confirmation`]: always answers `answer`, recording prompts.
pub struct ScriptedConfirmation {
    pub answer: bool,
    pub prompts: Vec<String>,
}

impl ScriptedConfirmation {
    pub fn yes() -> Self {
        Self { answer: true, prompts: Vec::new() }
    }

    pub fn no() -> Self {
        Self { answer: false, prompts: Vec::new() }
    }
}

impl Confirmation for ScriptedConfirmation {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.answer)
    }
}

/// GUIDs from the role table, spelled out for fixtures.
pub const GUID_SWAP: &str = "0657fd6d-a4ab-43c4-84e5-0933c84b4f4f";
pub const GUID_BIOS: &str = "21686148-6449-6e6f-744e-656564454649";
pub const GUID_DATA: &str = "0fc63daf-8483-4772-8e79-3d69d8477de4";

/// One child partition for [`device_json`]: name, parttype GUID, mountpoint.
pub type Child<'a> = (&'a str, &'a str, Option<&'a str>);

/// Build an lsblk-shaped JSON document for one device.
pub fn device_json(name: &str, mountpoint: Option<&str>, children: &[Child]) -> String {
    let children: Vec<serde_json::Value> = children
        .iter()
        .map(|(child_name, parttype, child_mount)| {
            serde_json::json!({
                "name": child_name,
                "fstype": null,
                "mountpoint": child_mount,
                "label": null,
                "partlabel": child_name,
                "size": "1G",
                "parttype": parttype,
            })
        })
        .collect();

    serde_json::json!({
        "blockdevices": [{
            "name": name,
            "type": "disk",
            "group": "disk",
            "mountpoint": mountpoint,
            "children": children,
        }]
    })
    .to_string()
}

/// Like [`device_json`] but with explicit lsblk `type`/`group` columns.
pub fn device_json_with_media(name: &str, kind: &str, group: &str) -> String {
    serde_json::json!({
        "blockdevices": [{
            "name": name,
            "type": kind,
            "group": group,
            "mountpoint": null,
            "children": [],
        }]
    })
    .to_string()
}
