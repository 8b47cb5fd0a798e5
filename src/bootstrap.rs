//! Base system bootstrap
//!
//! The post-partitioning steps that turn the mounted tree into an Arch
//! system: rank pacman mirrors, pacstrap the base group, generate fstab,
//! and drop the operator into a chroot. These are simple, order-independent
//! I/O wrappers around the arch-install-scripts tooling (no state machine,
//! no reconciliation), so they use `anyhow` with context rather than the
//! typed core errors.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use log::{debug, info};

/// Live-ISO pacman mirrorlist the ranking step rewrites.
pub const MIRRORLIST: &str = "/etc/pacman.d/mirrorlist";

/// How many ranked mirrors to keep.
const MIRROR_KEEP: u32 = 5;

/// The install root must already exist and be a directory (the mount
/// subcommand creates and populates it).
pub fn ensure_install_root(prefix: &Path) -> Result<()> {
    if !prefix.is_dir() {
        bail!("not a dir: {}", prefix.display());
    }
    Ok(())
}

/// Extract usable `Server` lines from a mirrorlist document.
///
/// Commented-out `#Server` entries are uncommented and kept; other comment
/// lines and blanks are dropped; already-active lines pass through.
fn extract_server_lines(input: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.to_lowercase().contains("#server") {
            lines.push(line.trim_start_matches('#').trim().to_string());
        } else if !line.starts_with('#') {
            lines.push(line.to_string());
        }
    }
    lines
}

/// Keep the ranked `Server` lines from rankmirrors output, dropping the
/// header comments it prepends.
fn ranked_server_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter(|line| line.to_lowercase().contains("server"))
        .map(str::to_string)
        .collect()
}

/// Rank the pacman mirrors and rewrite the live mirrorlist.
///
/// Preserves the pristine list as `mirrorlist.orig` on first run, builds a
/// `mirrorlist.backup` working file of usable server lines, ranks it, and
/// writes the winners back to the live mirrorlist.
pub fn refresh_mirrorlist(mirrorlist: &Path) -> Result<()> {
    let orig = sibling_with_suffix(mirrorlist, ".orig");
    let backup = sibling_with_suffix(mirrorlist, ".backup");

    if !orig.is_file() {
        fs::copy(mirrorlist, &orig)
            .with_context(|| format!("failed to preserve {}", mirrorlist.display()))?;
    }

    let pristine = fs::read_to_string(&orig)
        .with_context(|| format!("failed to read {}", orig.display()))?;
    let servers = extract_server_lines(&pristine);
    debug!("{} candidate mirrors", servers.len());
    fs::write(&backup, servers.join("\n") + "\n")
        .with_context(|| format!("failed to write {}", backup.display()))?;

    info!("Ranking mirrors.. Please wait..");
    let output = Command::new("rankmirrors")
        .args(["-n", &MIRROR_KEEP.to_string()])
        .arg(&backup)
        .output()
        .context("failed to run rankmirrors")?;
    if !output.status.success() {
        bail!(
            "rankmirrors failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let ranked = ranked_server_lines(&String::from_utf8_lossy(&output.stdout));
    if ranked.is_empty() {
        bail!("rankmirrors produced no usable mirrors");
    }
    fs::write(mirrorlist, ranked.join("\n") + "\n")
        .with_context(|| format!("failed to write {}", mirrorlist.display()))?;
    info!("Kept {} ranked mirrors", ranked.len());
    Ok(())
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Install the base package group into the mounted tree.
pub fn install_base(prefix: &Path) -> Result<()> {
    info!("Installing base system into {}", prefix.display());
    let status = Command::new("pacstrap")
        .arg(prefix)
        .arg("base")
        .status()
        .context("failed to run pacstrap")?;
    if !status.success() {
        bail!("pacstrap exited with {status}");
    }
    Ok(())
}

/// Append the generated fstab to `<prefix>/etc/fstab`.
pub fn write_fstab(prefix: &Path) -> Result<()> {
    let output = Command::new("genfstab")
        .args(["-U"])
        .arg(prefix)
        .output()
        .context("failed to run genfstab")?;
    if !output.status.success() {
        bail!(
            "genfstab failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let fstab_path = prefix.join("etc").join("fstab");
    let mut fstab = OpenOptions::new()
        .append(true)
        .open(&fstab_path)
        .with_context(|| format!("failed to open {}", fstab_path.display()))?;
    fstab.write_all(&output.stdout)?;
    info!("Wrote fstab entries to {}", fstab_path.display());
    Ok(())
}

/// Drop the operator into the new system. Interactive: stdio is inherited,
/// not captured.
pub fn enter_chroot(prefix: &Path) -> Result<()> {
    info!("Entering chroot at {}", prefix.display());
    let status = Command::new("arch-chroot")
        .arg(prefix)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .context("failed to run arch-chroot")?;
    if !status.success() {
        bail!("arch-chroot exited with {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_uncomments_server_lines() {
        let input = "\
## Arch Linux mirrorlist
#Server = https://mirror.one/$repo/os/$arch

Server = https://mirror.two/$repo/os/$arch
# just a comment
";
        let lines = extract_server_lines(input);
        assert_eq!(
            lines,
            vec![
                "Server = https://mirror.one/$repo/os/$arch".to_string(),
                "Server = https://mirror.two/$repo/os/$arch".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_drops_blank_and_comment_lines() {
        let input = "\n\n# header\n## more header\n";
        assert!(extract_server_lines(input).is_empty());
    }

    #[test]
    fn test_ranked_output_keeps_only_server_lines() {
        let stdout = "\
# Server list generated by rankmirrors on 2017-05-01
Server = https://fast.mirror/$repo/os/$arch
Server = https://slower.mirror/$repo/os/$arch
";
        let ranked = ranked_server_lines(stdout);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].starts_with("Server = https://fast.mirror"));
    }

    #[test]
    fn test_sibling_suffix_names() {
        let path = Path::new("/etc/pacman.d/mirrorlist");
        assert_eq!(
            sibling_with_suffix(path, ".orig"),
            PathBuf::from("/etc/pacman.d/mirrorlist.orig")
        );
    }

    #[test]
    fn test_ensure_install_root_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(ensure_install_root(&missing).is_err());
        assert!(ensure_install_root(dir.path()).is_ok());
    }
}
