mod alert;
mod collectors;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod netstat;

use alert::{ConnectionBounds, Report, Status, Thresholds};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use config::{Config, ConfigError};
use error::ProbeError;
use netstat::aggregate::Destination;
use netstat::users::SystemUsers;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostcheck")]
#[command(version)]
#[command(about = "Host health probes with monitoring-plugin output")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
    #[command(subcommand)]
    probe: Option<Probe>,
}

#[derive(Subcommand, Debug)]
enum Probe {
    /// Established TCP connections to one destination
    Netstat(NetstatArgs),
    /// CPU utilisation between two samples of /proc/stat
    Cpu {
        #[command(flatten)]
        limits: LimitArgs,
        #[arg(short, long, value_parser = parse_interval)]
        interval: Option<Duration>,
    },
    /// Memory in use, excluding buffers and page cache
    Mem(LimitArgs),
    /// Swap in use
    Swap(LimitArgs),
    /// Capacity used on one mounted filesystem
    Disk {
        #[command(flatten)]
        limits: LimitArgs,
        #[arg(short, long)]
        mount_point: String,
    },
    /// One-minute load average
    Load {
        #[command(flatten)]
        limits: LimitArgs,
        /// Divide load1 by the number of logical CPUs
        #[arg(long)]
        cpu_count: bool,
    },
    /// Interface throughput in kB/s
    Network {
        #[command(flatten)]
        limits: LimitArgs,
        #[arg(short, long, value_parser = parse_interval)]
        interval: Option<Duration>,
        #[arg(short, long)]
        device: String,
    },
}

#[derive(Args, Debug)]
struct LimitArgs {
    #[arg(short, long)]
    warning: Option<f64>,
    #[arg(short, long)]
    critical: Option<f64>,
    /// Always report OK
    #[arg(short, long)]
    no_alert: bool,
}

#[derive(Args, Debug)]
struct NetstatArgs {
    #[arg(short = 'H', long, required_unless_present = "debug")]
    host: Option<String>,
    #[arg(short, long, required_unless_present = "debug")]
    port: Option<u16>,
    #[arg(long)]
    min: Option<u64>,
    #[arg(long)]
    max: Option<u64>,
    #[arg(short, long)]
    no_alert: bool,
    /// List every socket table entry and packet socket owner
    #[arg(short, long)]
    debug: bool,
    #[arg(long, requires = "debug")]
    json: bool,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }
    let Some(probe) = cli.probe else {
        Cli::command()
            .error(ErrorKind::MissingSubcommand, "a probe subcommand is required")
            .exit();
    };

    let cfg = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            println!("ERROR: {err}");
            std::process::exit(Status::Unknown.exit_code());
        }
    };

    match run(probe, &cfg) {
        Ok(Some(report)) => {
            println!("{report}");
            std::process::exit(report.status.exit_code());
        }
        Ok(None) => {}
        Err(err) => {
            error!(error = %err, "probe failed");
            println!("ERROR: {err}");
            std::process::exit(Status::Unknown.exit_code());
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Ok(Config::default()),
    }
}

/// Bare seconds (`5`) or a humantime duration (`500ms`, `2s`).
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(raw).map_err(|err| err.to_string())?,
    };
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

fn thresholds(limits: &LimitArgs, warning: f64, critical: f64) -> Result<Thresholds, ProbeError> {
    Thresholds::new(
        limits.warning.unwrap_or(warning),
        limits.critical.unwrap_or(critical),
    )
}

fn run(probe: Probe, cfg: &Config) -> Result<Option<Report>, ProbeError> {
    let proc_root = cfg.proc_root.as_path();
    let report = match probe {
        Probe::Netstat(args) => return run_netstat(&args, cfg),
        Probe::Cpu { limits, interval } => {
            let t = thresholds(&limits, cfg.cpu.warning, cfg.cpu.critical)?;
            let interval = interval.unwrap_or(Duration::from_secs(cfg.cpu.interval_secs));
            collectors::cpu::check_cpu(proc_root, interval, &t, limits.no_alert)?
        }
        Probe::Mem(limits) => {
            let t = thresholds(&limits, cfg.memory.warning, cfg.memory.critical)?;
            collectors::memory::check_memory(proc_root, &t, limits.no_alert)?
        }
        Probe::Swap(limits) => {
            let t = thresholds(&limits, cfg.swap.warning, cfg.swap.critical)?;
            collectors::memory::check_swap(proc_root, &t, limits.no_alert)?
        }
        Probe::Disk {
            limits,
            mount_point,
        } => {
            let t = thresholds(&limits, cfg.disk.warning, cfg.disk.critical)?;
            collectors::disk::check_disk(
                proc_root,
                &mount_point,
                &cfg.disk.exclude_fstypes,
                &t,
                limits.no_alert,
            )?
        }
        Probe::Load { limits, cpu_count } => {
            let t = thresholds(&limits, cfg.load.warning, cfg.load.critical)?;
            collectors::load::check_load(proc_root, &t, cpu_count || cfg.load.per_cpu, limits.no_alert)?
        }
        Probe::Network {
            limits,
            interval,
            device,
        } => {
            let t = thresholds(&limits, cfg.network.warning, cfg.network.critical)?;
            let interval = interval.unwrap_or(Duration::from_secs(cfg.network.interval_secs));
            collectors::network::check_network(proc_root, &device, interval, &t, limits.no_alert)?
        }
    };
    Ok(Some(report))
}

fn run_netstat(args: &NetstatArgs, cfg: &Config) -> Result<Option<Report>, ProbeError> {
    let users = SystemUsers;
    if args.debug {
        let listing = netstat::socket_listing(&cfg.proc_root, &users)?;
        if args.json {
            println!("{}", listing.to_json()?);
        } else {
            print!("{}", listing.render_text());
        }
    }

    let (Some(host), Some(port)) = (args.host.as_deref(), args.port) else {
        return Ok(None);
    };
    let bounds = ConnectionBounds::new(
        args.min.unwrap_or(cfg.netstat.min),
        args.max.unwrap_or(cfg.netstat.max),
    )?;
    let destination = Destination::new(host, port)?;
    let result = netstat::check_netstat(&cfg.proc_root, &destination, &users)?;
    info!(
        host,
        port,
        total = result.total_connections,
        established = result.established(),
        "connections aggregated"
    );
    Ok(Some(netstat::netstat_report(
        &result,
        &destination,
        &bounds,
        args.no_alert,
    )))
}
