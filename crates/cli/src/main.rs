mod check_commands;
mod runtime;

use std::{path::PathBuf, process::ExitCode};

use {
    anyhow::Result,
    clap::{Parser, Subcommand},
    courier_config::{CourierConfig, Role, validate},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "courier", about = "Courier: Discord gateway to message broker bridge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/courier/).
    #[arg(long, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and relay events to and from the broker.
    Bridge,
    /// Consume the inbox queue and run command handlers.
    Worker,
    /// Run bridge and worker in one process over an in-memory broker.
    Standalone,
    /// Validate configuration, commands, and locales.
    Check {
        /// Process role to validate for.
        #[arg(long, value_enum, default_value = "standalone")]
        role: check_commands::CheckRole,
        /// Show informational diagnostics and loaded resources.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<CourierConfig> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = courier_config::load_config(path)?;
            courier_config::apply_env_overrides(&mut config);
            config
        },
        None => courier_config::discover_and_load()?,
    };
    Ok(config)
}

/// Log non-fatal diagnostics and fail on errors.
fn validate_for(config: &CourierConfig, role: Role) -> Result<()> {
    let result = validate(config, role).into_result()?;
    for d in &result.diagnostics {
        info!(path = d.path, severity = %d.severity, "{}", d.message);
    }
    Ok(())
}

/// Cancelled on ctrl-c.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received ctrl-c, shutting down");
                trigger.cancel();
            },
            Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });
    token
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Bridge => {
            validate_for(&config, Role::Bridge)?;
            let broker = runtime::nats(&config).await?;
            runtime::run_bridge(&config, broker, shutdown_token()).await
        },
        Commands::Worker => {
            validate_for(&config, Role::Worker)?;
            let broker = runtime::nats(&config).await?;
            runtime::run_worker(&config, broker, shutdown_token()).await
        },
        Commands::Standalone => {
            validate_for(&config, Role::Standalone)?;
            runtime::run_standalone(&config, shutdown_token()).await
        },
        Commands::Check { role, verbose } => check_commands::check(&config, role, verbose),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal error");
            ExitCode::FAILURE
        },
    }
}
