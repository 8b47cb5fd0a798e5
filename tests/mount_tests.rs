//! Tests for the mount orchestrator
//!
//! Verifies the directional scan asymmetry: root comes from the *last*
//! data-role partition (reverse scan), boot from the *first* (forward scan),
//! with swap and BIOS-boot partitions invisible to both.

mod common;

use archstrap::error::InstallerError;
use archstrap::mount::{self, MountEntry};

use common::{FakeTools, device_json, GUID_BIOS, GUID_DATA, GUID_SWAP};

#[test]
fn test_reverse_scan_mounts_last_data_partition_as_root() {
    let tools = FakeTools::new(device_json(
        "sda",
        None,
        &[
            ("sda1", GUID_BIOS, None),
            ("sda2", GUID_DATA, None), // "root" in plan order
            ("sda3", GUID_DATA, None), // "extra" in plan order
        ],
    ));
    let prefix = tempfile::tempdir().unwrap();

    let map = mount::mount_tree(&tools, "/dev/sda", prefix.path()).unwrap();

    // Reverse scan picks the LAST data partition for the root target;
    // forward scan picks the FIRST for /boot.
    let boot_dir = prefix.path().join("boot");
    assert_eq!(
        map.entries,
        vec![
            MountEntry {
                target: prefix.path().to_path_buf(),
                device: "/dev/sda3".to_string(),
            },
            MountEntry {
                target: boot_dir.clone(),
                device: "/dev/sda2".to_string(),
            },
        ]
    );

    // Mount order: root strictly before boot, and the boot directory exists.
    let mounts = tools.calls_matching("mount");
    assert_eq!(
        mounts,
        vec![
            format!("mount /dev/sda3 {}", prefix.path().display()),
            format!("mount /dev/sda2 {}", boot_dir.display()),
        ]
    );
    assert!(boot_dir.is_dir());

    // The BIOS boot partition is invisible to both scans.
    assert!(!mounts.iter().any(|call| call.contains("/dev/sda1")));
}

#[test]
fn test_swap_is_skipped_by_both_scans() {
    let tools = FakeTools::new(device_json(
        "sda",
        None,
        &[
            ("sda1", GUID_DATA, None),
            ("sda2", GUID_SWAP, None),
            ("sda3", GUID_DATA, None),
        ],
    ));
    let prefix = tempfile::tempdir().unwrap();

    let map = mount::mount_tree(&tools, "/dev/sda", prefix.path()).unwrap();

    assert_eq!(map.entries[0].device, "/dev/sda3");
    assert_eq!(map.entries[1].device, "/dev/sda1");
    assert!(!tools.calls_matching("mount").iter().any(|c| c.contains("sda2")));
}

#[test]
fn test_single_data_partition_mounts_root_only() {
    let tools = FakeTools::new(device_json(
        "sda",
        None,
        &[("sda1", GUID_BIOS, None), ("sda2", GUID_DATA, None)],
    ));
    let prefix = tempfile::tempdir().unwrap();

    let map = mount::mount_tree(&tools, "/dev/sda", prefix.path()).unwrap();

    // Both scans select sda2; the boot mount is skipped instead of
    // double-mounting one filesystem.
    assert_eq!(map.entries.len(), 1);
    assert_eq!(map.entries[0].device, "/dev/sda2");
    assert_eq!(tools.calls_matching("mount").len(), 1);
}

#[test]
fn test_no_partitions_is_state_inconsistency() {
    let tools = FakeTools::new(device_json("sda", None, &[]));
    let prefix = tempfile::tempdir().unwrap();

    let err = mount::mount_tree(&tools, "/dev/sda", prefix.path()).unwrap_err();
    assert!(matches!(err, InstallerError::StateInconsistency(_)));
}

#[test]
fn test_no_data_partition_is_an_error() {
    let tools = FakeTools::new(device_json(
        "sda",
        None,
        &[("sda1", GUID_BIOS, None), ("sda2", GUID_SWAP, None)],
    ));
    let prefix = tempfile::tempdir().unwrap();

    let err = mount::mount_tree(&tools, "/dev/sda", prefix.path()).unwrap_err();
    assert!(matches!(err, InstallerError::Precondition(_)));
    assert!(tools.calls_matching("mount").is_empty());
}

#[test]
fn test_existing_mounts_are_released_before_mounting() {
    let tools = FakeTools::new(device_json(
        "sda",
        None,
        &[
            ("sda1", GUID_DATA, Some("/mnt/stale")),
            ("sda2", GUID_DATA, None),
        ],
    ));
    let prefix = tempfile::tempdir().unwrap();

    mount::mount_tree(&tools, "/dev/sda", prefix.path()).unwrap();

    let calls = tools.calls();
    let umount_at = calls.iter().position(|c| c == "umount /mnt/stale").unwrap();
    let first_mount_at = calls.iter().position(|c| c.starts_with("mount ")).unwrap();
    assert!(umount_at < first_mount_at);
}

#[test]
fn test_mount_failure_is_fatal() {
    let prefix = tempfile::tempdir().unwrap();
    let tools = FakeTools::new(device_json(
        "sda",
        None,
        &[("sda1", GUID_DATA, None), ("sda2", GUID_DATA, None)],
    ))
    .failing_on("mount /dev/sda2");

    let err = mount::mount_tree(&tools, "/dev/sda", prefix.path()).unwrap_err();
    assert!(matches!(err, InstallerError::ExternalTool { .. }));
}
