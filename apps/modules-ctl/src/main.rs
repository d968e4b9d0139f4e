use std::path::PathBuf;

use anyhow::{Context, Result};
use app_modules::{ExecutionIdentity, ModulesConfig, ModulesLocalClient, PendingCall};
use app_modules_sdk::{HostnameRequest, ModulesClient};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Inspect and control App Engine modules and versions
#[derive(Parser)]
#[command(name = "modules-ctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the admin REST API instead of the legacy RPC service
    #[arg(long)]
    admin: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Module and version selection; either falls back to the current process.
#[derive(Args)]
struct Target {
    #[arg(short, long)]
    module: Option<String>,
    #[arg(long)]
    version: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the application's modules
    Modules,
    /// List the versions of a module
    Versions {
        #[arg(short, long)]
        module: Option<String>,
    },
    /// Print the version receiving the largest traffic share
    DefaultVersion {
        #[arg(short, long)]
        module: Option<String>,
    },
    /// Print the instance count of a manually scaled version
    Instances(Target),
    /// Set the instance count of a manually scaled version
    SetInstances {
        count: u32,
        #[command(flatten)]
        target: Target,
    },
    /// Start serving a version
    Start(Target),
    /// Stop serving a version
    Stop(Target),
    /// Print the hostname addressing a module, version or instance
    Hostname {
        #[command(flatten)]
        target: Target,
        #[arg(short, long)]
        instance: Option<String>,
    },
    /// Print the module, version and instance of this process
    Whoami,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Waits on a submitted call and reports which operation failed.
async fn finish<T>(call: PendingCall<T>) -> Result<T> {
    let operation = call.operation();
    call.result()
        .await
        .with_context(|| format!("{operation} failed"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = ModulesConfig::load(cli.config.as_deref())?;
    if cli.admin {
        config.use_admin_api = true;
    }
    tracing::debug!(
        mode = config.backend_mode().as_str(),
        config = ?cli.config,
        "configuration loaded"
    );
    let client = app_modules::build_client(&config)?;

    run(&client, cli.command).await
}

async fn run(client: &ModulesLocalClient, command: Commands) -> Result<()> {
    match command {
        Commands::Modules => {
            for module in client.list_modules().await? {
                println!("{module}");
            }
        }
        Commands::Versions { module } => {
            for version in client.list_versions(module.as_deref()).await? {
                println!("{version}");
            }
        }
        Commands::DefaultVersion { module } => {
            println!("{}", client.get_default_version(module.as_deref()).await?);
        }
        Commands::Instances(t) => {
            let count = client
                .get_instance_count(t.module.as_deref(), t.version.as_deref())
                .await?;
            println!("{count}");
        }
        Commands::SetInstances { count, target: t } => {
            let call =
                client.submit_set_instance_count(count, t.module.as_deref(), t.version.as_deref());
            finish(call).await?;
        }
        Commands::Start(t) => {
            finish(client.submit_start_version(t.module.as_deref(), t.version.as_deref())).await?;
        }
        Commands::Stop(t) => {
            finish(client.submit_stop_version(t.module.as_deref(), t.version.as_deref())).await?;
        }
        Commands::Hostname { target, instance } => {
            let mut request = HostnameRequest::new();
            if let Some(module) = target.module {
                request = request.module(module);
            }
            if let Some(version) = target.version {
                request = request.version(version);
            }
            if let Some(instance) = instance {
                request = request.instance(instance);
            }
            println!("{}", client.get_hostname(&request).await?);
        }
        Commands::Whoami => print_identity(client.service().identity()),
    }
    Ok(())
}

fn print_identity(identity: &ExecutionIdentity) {
    println!("module:   {}", identity.module().unwrap_or("-"));
    println!("version:  {}", identity.version().unwrap_or("-"));
    println!("instance: {}", identity.instance().unwrap_or("-"));
}
