use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use probe_core::collector::AttributeCollector;
use probe_core::config::ProbeConfig;
use probe_core::report;

#[derive(Parser, Debug)]
#[command(name = "node-probe")]
#[command(about = "Collect OS, CPU, memory and disk attributes of this node")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, env = "NODE_PROBE_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Where to write the report (default: node_attribute_information.json)
    #[arg(long, env = "NODE_PROBE_OUTPUT", global = true)]
    output: Option<PathBuf>,

    /// Disk table to report instead of live partitions (default: host_disk_info.txt)
    #[arg(long, env = "NODE_PROBE_DISK_OVERRIDE", global = true)]
    disk_override: Option<PathBuf>,

    /// Always query live partitions, even if an override table exists
    #[arg(long)]
    no_disk_override: bool,

    /// Print the report to stdout instead of writing it to a file
    #[arg(long)]
    stdout: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "NODE_PROBE_LOG_LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the effective configuration to the config file
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("node-probe failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    info!(
        "node-probe v{} starting (os={}, arch={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    );

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(ProbeConfig::default_path);

    let mut config = if config_path.exists() {
        info!("loading config from {}", config_path.display());
        ProbeConfig::load(&config_path)?
    } else {
        ProbeConfig::default()
    };

    // CLI args override config file
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if let Some(table) = cli.disk_override {
        config.disk_override_path = Some(table);
    }
    if cli.no_disk_override {
        config.disk_override_path = None;
    }

    if let Some(Commands::InitConfig { force }) = cli.command {
        return init_config(&config, &config_path, force);
    }

    let host = create_platform_host_info()?;
    let mut collector = AttributeCollector::new(host);
    if let Some(table) = &config.disk_override_path {
        collector = collector.with_disk_override(table);
    }

    let document = collector
        .collect()
        .context("node attribute collection failed")?;

    if cli.stdout {
        println!("{}", report::render(&document)?);
    } else {
        report::write(&document, &config.output_path)?;
        info!("report written to {}", config.output_path.display());
    }
    Ok(())
}

fn init_config(config: &ProbeConfig, path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file {} already exists (use --force to overwrite)",
            path.display()
        );
    }
    config.save(path)?;
    info!("config saved to {}", path.display());
    Ok(())
}

#[cfg(target_os = "linux")]
fn create_platform_host_info() -> Result<Box<dyn probe_platform::host_info::HostInfo>> {
    Ok(Box::new(probe_linux::host_info::LinuxHostInfo::new()))
}

#[cfg(target_os = "windows")]
fn create_platform_host_info() -> Result<Box<dyn probe_platform::host_info::HostInfo>> {
    Ok(Box::new(probe_windows::host_info::WindowsHostInfo::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn create_platform_host_info() -> Result<Box<dyn probe_platform::host_info::HostInfo>> {
    anyhow::bail!("host info not supported on this platform")
}
