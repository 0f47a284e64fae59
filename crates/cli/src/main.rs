mod check_commands;
mod config_commands;
mod tool_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tollgate_metrics::{MetricsRecorderConfig, init_metrics},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "tollgate",
    version,
    about = "Tollgate: call tools on a remote MCP server with an Entra ID bearer token"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./tollgate.toml and ~/.config/tollgate/).
    #[arg(long, short, global = true, env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Print collected metrics in Prometheus format to stderr on exit.
    #[arg(long, global = true, default_value_t = false)]
    print_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check configuration, token acquisition and a probe tool call.
    Check {
        /// Tool used for the connectivity probe.
        #[arg(long, default_value = "list_tables")]
        tool: String,
        /// Probe arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Stop after the token check.
        #[arg(long)]
        skip_probe: bool,
    },
    /// Acquire a token for the configured scope and describe it.
    Token {
        /// Discard the first token and acquire another.
        #[arg(long)]
        refresh: bool,
    },
    /// List the tools the server exposes (filtered by the allow list).
    Tools {
        #[arg(long)]
        json: bool,
    },
    /// Call a tool and print its JSON payload.
    Call {
        /// Tool name, e.g. list_tables.
        tool: String,
        /// Arguments as a JSON object.
        #[arg(long, short, default_value = "{}")]
        args: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    let metrics = init_metrics(MetricsRecorderConfig {
        enabled: cli.print_metrics,
        global_labels: vec![("service".into(), "tollgate".into())],
    })?;

    debug!(version = env!("CARGO_PKG_VERSION"), "tollgate starting");

    let config = cli.config.as_deref();
    let outcome = match cli.command {
        Commands::Check {
            tool,
            args,
            skip_probe,
        } => {
            let options = check_commands::CheckOptions {
                probe_tool: tool,
                probe_args: tool_commands::parse_arguments(&args)?,
                skip_probe,
            };
            check_commands::handle_check(config, options).await
        },
        Commands::Token { refresh } => tool_commands::handle_token(config, refresh).await,
        Commands::Tools { json } => tool_commands::handle_tools(config, json).await,
        Commands::Call { tool, args } => tool_commands::handle_call(config, &tool, &args).await,
        Commands::Config { action } => config_commands::handle_config(config, action).await,
    };

    if cli.print_metrics {
        eprintln!("{}", metrics.render());
    }
    outcome
}
