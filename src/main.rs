use anyhow::Result;
use aro_recorder::{
    app,
    cli::{handle_convert_command, handle_formats_command, handle_prefs_command, Cli, CliCommand},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("aro-recorder {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Convert(args)) => {
            handle_convert_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Prefs(args)) => {
            handle_prefs_command(args)?;
            return Ok(());
        }
        Some(CliCommand::Formats) => {
            handle_formats_command();
            return Ok(());
        }
        None => {}
    }

    app::run_service().await
}
