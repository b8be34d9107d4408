/// Version injected at compile time via VPCAUDIT_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("VPCAUDIT_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use vpcaudit::analysis::{PortQuery, RiskLevel, UsageReport};
use vpcaudit::config::Config;
use vpcaudit::error;
use vpcaudit::resource::Protocol;
use vpcaudit::VpcInspector;

/// Multi-region security, backup and capacity analysis for IBM Cloud VPC
#[derive(Parser, Debug)]
#[command(name = "vpcaudit", version = VERSION, about, long_about = None)]
struct Args {
    /// Regions to query (comma-separated); defaults to the config, then every reachable region
    #[arg(short, long, value_delimiter = ',', global = true)]
    region: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    /// Regions queried at once
    #[arg(long, global = true)]
    max_concurrent: Option<usize>,

    /// Per-region time limit in seconds
    #[arg(long, global = true)]
    region_timeout: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known regions
    Regions,
    /// Security group rules exposing SSH (tcp/22) to the internet
    OpenSsh {
        #[arg(long)]
        vpc: Option<String>,
    },
    /// Security group rules exposing RDP (tcp/3389) to the internet
    OpenRdp {
        #[arg(long)]
        vpc: Option<String>,
    },
    /// Security group rules exposing a port to a source CIDR
    ExposedPort {
        #[arg(long, default_value = "tcp")]
        protocol: Protocol,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value = "0.0.0.0/0")]
        source: String,
        #[arg(long)]
        vpc: Option<String>,
    },
    /// Classify every security group rule
    ScanRules {
        #[arg(long)]
        vpc: Option<String>,
        #[arg(long, default_value = "medium")]
        min_level: RiskLevel,
    },
    /// Backup policy health
    Backups {
        #[arg(long)]
        resource_group: Option<String>,
    },
    /// One backup policy with its plans, recent jobs and health
    BackupPolicy { id: String },
    /// Block volume and snapshot usage
    Storage,
    /// Look up a routing table by name
    RoutingTable {
        #[arg(long)]
        vpc: String,
        name: String,
    },
    /// Look up a VPC by name
    Vpc { name: String },
    /// Resource counts and SSH exposure of one VPC
    VpcSummary { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("vpcaudit {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("vpcaudit").join("vpcaudit.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".vpcaudit").join("vpcaudit.log");
    }
    PathBuf::from("vpcaudit.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let mut config = Config::load();
    if args.max_concurrent.is_some() {
        config.max_concurrent_regions = args.max_concurrent;
    }
    if args.region_timeout.is_some() {
        config.region_timeout_secs = args.region_timeout;
    }
    let scope = if args.region.is_empty() {
        config.regions.clone()
    } else {
        args.region.clone()
    };

    let code = match execute(&args, &config, &scope).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let fatal = error::find_error(&err).is_some_and(|e| e.is_fatal());
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            if fatal {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    };

    drop(log_guard);
    code
}

async fn execute(args: &Args, config: &Config, scope: &[String]) -> Result<()> {
    let inspector = VpcInspector::from_config(config)?;
    let value = run_command(&inspector, &args.command, scope).await?;

    let rendered = match args.output {
        OutputFormat::Json => serde_json::to_string_pretty(&value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&value)?,
    };
    println!("{}", rendered);
    Ok(())
}

async fn run_command(inspector: &VpcInspector, command: &Command, scope: &[String]) -> Result<Value> {
    let value = match command {
        Command::Regions => serde_json::to_value(inspector.list_regions().await?)?,
        Command::OpenSsh { vpc } => {
            serde_json::to_value(inspector.find_open_ssh(scope, vpc.as_deref()).await?)?
        }
        Command::OpenRdp { vpc } => {
            serde_json::to_value(inspector.find_open_rdp(scope, vpc.as_deref()).await?)?
        }
        Command::ExposedPort {
            protocol,
            port,
            source,
            vpc,
        } => {
            let query = PortQuery::new(*protocol, *port, source)?;
            serde_json::to_value(
                inspector
                    .find_exposed_port(scope, &query, vpc.as_deref())
                    .await?,
            )?
        }
        Command::ScanRules { vpc, min_level } => serde_json::to_value(
            inspector
                .scan_security_groups(scope, vpc.as_deref(), *min_level)
                .await?,
        )?,
        Command::Backups { resource_group } => serde_json::to_value(
            inspector
                .analyze_backup_policies(scope, resource_group.as_deref())
                .await?,
        )?,
        Command::BackupPolicy { id } => {
            serde_json::to_value(inspector.backup_policy_summary(scope, id).await?)?
        }
        Command::Storage => {
            let result = inspector.analyze_storage_usage(scope).await?;
            let mut total = UsageReport::default();
            for report in result.succeeded.values() {
                total.merge(report.clone());
            }
            json!({ "regions": result, "total": total })
        }
        Command::RoutingTable { vpc, name } => serde_json::to_value(
            inspector
                .find_routing_table_by_name(scope, vpc, name)
                .await?,
        )?,
        Command::Vpc { name } => serde_json::to_value(inspector.find_vpc_by_name(scope, name).await?)?,
        Command::VpcSummary { id } => serde_json::to_value(inspector.vpc_summary(scope, id).await?)?,
    };
    Ok(value)
}
