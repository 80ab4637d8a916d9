//! Network convergence tool (netconverge)
//!
//! Applies declared network settings to the host.
//!
//! # Usage
//!
//! ```bash
//! # Converge DHCP client configuration
//! sudo netconverge --settings /var/vcap/bosh/settings.json dhcp
//!
//! # Converge static networking and announce the new addresses
//! sudo netconverge --settings settings.json manual
//!
//! # Show what would be written, without touching anything
//! netconverge --settings settings.json render interfaces
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use libnetconverge::{
    GratuitousArpAnnouncer, IfupdownNetManager, JsonSettingsProvider, NetManager,
    NetconvergeConfig, Networks, OsCommandRunner, OsFileSystem, SettingsProvider,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG: &str = "/etc/netconverge/netconverge.toml";

/// Network convergence tool
#[derive(Parser, Debug)]
#[command(name = "netconverge")]
#[command(version)]
#[command(about = "Converge host networking to declared settings", long_about = None)]
struct Args {
    /// Configuration file (defaults apply if it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Settings document with the declared networks
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Converge the DHCP client configuration
    Dhcp,
    /// Converge static networking, then announce addresses
    Manual,
    /// List network devices by hardware address
    Devices,
    /// Print a rendered configuration file without writing it
    Render {
        #[arg(value_enum)]
        file: RenderTarget,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RenderTarget {
    Dhcp,
    Interfaces,
    Resolv,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = NetconvergeConfig::load_or_default(&args.config)
        .with_context(|| format!("Loading {}", args.config.display()))?;

    let fs = Arc::new(OsFileSystem::new());
    let runner = Arc::new(OsCommandRunner::new());
    let announcer = Arc::new(GratuitousArpAnnouncer::new(
        fs.clone(),
        runner.clone(),
        config.paths.net_class_dir.clone(),
        config.arp.timing(),
    ));
    let manager = IfupdownNetManager::new(fs, runner, announcer.clone(), config.paths.clone());

    match args.command {
        Commands::Dhcp => {
            warn_if_not_root();
            let networks = load_networks(&args)?;
            manager.setup_dhcp(&networks).await.context("Setting up DHCP networking")?;
            info!("DHCP networking converged");
        }
        Commands::Manual => {
            warn_if_not_root();
            let networks = load_networks(&args)?;
            manager.setup_manual_networking(&networks).await
                .context("Setting up manual networking")?;
            info!("Manual networking converged, waiting for gratuitous ARP to finish");
            // Exiting would cancel the announcements
            announcer.drain().await;
        }
        Commands::Devices => {
            let devices = manager.detect_devices().await?;
            let mut devices: Vec<_> = devices.into_iter().collect();
            devices.sort_by(|a, b| a.1.cmp(&b.1));
            for (mac, device) in devices {
                println!("{}\t{}", device, mac);
            }
        }
        Commands::Render { file } => {
            let networks = load_networks(&args)?;
            let content = match file {
                RenderTarget::Dhcp => manager.render_dhcp_config(&networks)?,
                RenderTarget::Interfaces => manager.render_network_interfaces(&networks).await?,
                RenderTarget::Resolv => manager.render_resolv_conf(&networks)?,
            };
            print!("{}", content);
        }
    }

    Ok(())
}

fn load_networks(args: &Args) -> Result<Networks> {
    let path = args.settings.as_ref().context("--settings is required for this command")?;
    let provider = JsonSettingsProvider::load(path)?;
    info!("Loaded {} network(s) from {}", provider.networks().len(), provider.path().display());
    Ok(provider.networks().clone())
}

fn warn_if_not_root() {
    #[cfg(target_os = "linux")]
    {
        let uid = unsafe { libc::geteuid() };
        if uid != 0 {
            warn!("Not running as root - writes and restarts may fail");
        }
    }
}

/// Initialize logging based on command-line arguments
fn init_logging(args: &Args) {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new(format!("netconverge={},libnetconverge={}", log_level, log_level))
        });

    // stdout carries command output
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}
