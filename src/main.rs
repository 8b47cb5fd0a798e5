//! archstrap - Main entry point
//!
//! Subcommand dispatch for the provisioning pipeline: partition, mount,
//! bootstrap, plus the network and clock helpers. Exit code 1 on any
//! validation, precondition or stage failure; 0 on full success.

use std::path::Path;

use log::{debug, error, info};

use archstrap::cli::{Cli, Commands, resolve_block_device};
use archstrap::executor::StdinConfirmation;
use archstrap::hardware::FirmwareMode;
use archstrap::mount::INSTALL_PREFIX;
use archstrap::tools::SystemCommands;
use archstrap::{bootstrap, clock, executor, hardware, mount, sanity};

/// Initialize the logger with appropriate settings
fn init_logger(verbose: u8) {
    use env_logger::Builder;
    use std::io::Write;

    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    if cli.verbose > 0 {
        info!("Being verbose");
    }

    let result = match cli.command {
        Commands::Partition { device, partitions } => run_partition(&device, &partitions),
        Commands::Mount { device } => run_mount(&device),
        Commands::Bootstrap => run_bootstrap(),
        Commands::Network => run_network(),
        Commands::Clock => clock::ensure_ntp_sync(),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run_partition(device: &Path, partitions: &Path) -> anyhow::Result<()> {
    preflight(sanity::PROVISION_BINARIES);

    let device = resolve_block_device(device)?;
    let device = device.to_string_lossy();
    debug!("Target device {device}");

    let tools = SystemCommands::new();
    let mut confirm = StdinConfirmation;
    let firmware = FirmwareMode::detect();

    executor::provision_device(&device, partitions, &tools, &mut confirm, firmware)?;
    Ok(())
}

fn run_mount(device: &Path) -> anyhow::Result<()> {
    preflight(sanity::PROVISION_BINARIES);

    let device = resolve_block_device(device)?;
    let device = device.to_string_lossy();

    let tools = SystemCommands::new();
    let map = mount::mount_tree(&tools, &device, Path::new(INSTALL_PREFIX))?;
    print!("{map}");
    Ok(())
}

fn run_bootstrap() -> anyhow::Result<()> {
    preflight(sanity::BOOTSTRAP_BINARIES);

    let prefix = Path::new(INSTALL_PREFIX);
    bootstrap::ensure_install_root(prefix)?;
    bootstrap::refresh_mirrorlist(Path::new(bootstrap::MIRRORLIST))?;
    bootstrap::install_base(prefix)?;
    bootstrap::write_fstab(prefix)?;
    bootstrap::enter_chroot(prefix)?;
    Ok(())
}

fn run_network() -> anyhow::Result<()> {
    let adapters = hardware::network_adapters()?;
    for adapter in adapters {
        println!("{adapter}");
    }
    Ok(())
}

/// Verify binaries and privileges before anything destructive; exits 1
/// with a report when the environment is unusable.
fn preflight(binaries: &[&str]) {
    let result = sanity::verify_environment(binaries);
    if !result.is_ok() {
        sanity::print_error_and_exit(&result);
    }
}
