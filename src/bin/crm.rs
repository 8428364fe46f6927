use clap::Parser;
use crm_api::cli::Cli;
use crm_api::client::ClientError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = crm_api::cli::run(cli).await {
        if matches!(e.downcast_ref::<ClientError>(), Some(ClientError::SessionExpired)) {
            eprintln!("Your session has expired. Run `crm auth login <email>` to sign in again.");
            std::process::exit(2);
        }
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
