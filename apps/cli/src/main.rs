mod operations;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use linkplayctl_device::LinkplayClient;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "linkplayctl")]
#[command(version, about = "Control a linkplay device.", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv with error causes)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Device address (IP or hostname)
    address: String,

    /// Operation to run, followed by its arguments (e.g. `volume up 5`)
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "command"
    )]
    commands: Vec<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "warn,linkplayctl={0},linkplayctl_core={0},linkplayctl_device={0}",
                    level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(resolved) = operations::resolve(&cli.commands) else {
        tracing::warn!("No operation matches '{}'", cli.commands.join(" "));
        // usage goes to stdout; nothing useful to do if that fails
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    };
    tracing::debug!(
        "Resolved '{}' with arguments {:?}",
        resolved.name,
        resolved.args
    );

    match execute(&cli.address, &resolved).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if cli.verbose > 2 {
                tracing::error!("{:?}", e);
            }
            println!("ERROR - {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn execute(address: &str, resolved: &operations::Resolved) -> Result<String> {
    let mut client = LinkplayClient::new(address)
        .with_context(|| format!("Failed to set up client for '{}'", address))?;
    Ok(operations::run(&mut client, resolved).await?)
}
