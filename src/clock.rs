//! System clock synchronization
//!
//! Package signing breaks with a skewed clock, so the live environment must
//! be NTP-synchronized before bootstrapping. Queries `timedatectl status`,
//! enables NTP if needed, and polls until the clock reports synchronized.

use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, info};

/// Bound on each timedatectl invocation.
const TIMEDATECTL_TIMEOUT: Duration = Duration::from_secs(10);

/// One-second polls before giving up on synchronization.
const SYNC_ATTEMPTS: u32 = 300;

/// Whether `timedatectl status` output reports a synchronized clock.
fn clock_synchronized(status_output: &str) -> bool {
    status_output
        .lines()
        .map(str::trim)
        .any(|line| line.eq_ignore_ascii_case("System clock synchronized: yes"))
}

fn timedatectl(args: &[&str]) -> Result<String> {
    debug!("Running timedatectl {}", args.join(" "));

    let argv: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = Command::new("timedatectl").args(&argv).output();
        let _ = tx.send(result);
    });

    let output = match rx.recv_timeout(TIMEDATECTL_TIMEOUT) {
        Ok(result) => result.context("failed to run timedatectl")?,
        Err(_) => bail!(
            "timedatectl {} did not complete within {}s",
            args.join(" "),
            TIMEDATECTL_TIMEOUT.as_secs()
        ),
    };
    if !output.status.success() {
        bail!(
            "timedatectl {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Ensure the system clock is NTP-synchronized, enabling NTP if necessary.
///
/// Polls once per second, bounded at [`SYNC_ATTEMPTS`]; a clock that never
/// synchronizes is a hard error rather than an endless wait.
pub fn ensure_ntp_sync() -> Result<()> {
    if clock_synchronized(&timedatectl(&["status"])?) {
        info!("System clock already synchronized");
        return Ok(());
    }

    info!("Enabling NTP");
    timedatectl(&["set-ntp", "true"])?;

    for _ in 0..SYNC_ATTEMPTS {
        if clock_synchronized(&timedatectl(&["status"])?) {
            info!("System clock synchronized");
            return Ok(());
        }
        info!("Waiting for clock sync..");
        thread::sleep(Duration::from_secs(1));
    }

    bail!("system clock did not synchronize within {SYNC_ATTEMPTS}s")
}
