pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::CrmClient;

#[derive(Parser)]
#[command(name = "crm")]
#[command(about = "CRM CLI - Command-line client for the CRM API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Server URL (defaults to the logged-in server, then CRM_API_URL)")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Login, logout and session status")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Lead management")]
    Leads {
        #[command(subcommand)]
        cmd: commands::leads::LeadCommands,
    },

    #[command(about = "Customer management")]
    Customers {
        #[command(subcommand)]
        cmd: commands::customers::CustomerCommands,
    },

    #[command(about = "Task management")]
    Tasks {
        #[command(subcommand)]
        cmd: commands::tasks::TaskCommands,
    },

    #[command(about = "Show pipeline and workload counts")]
    Dashboard,

    #[command(about = "Show recent activity")]
    Activity {
        #[arg(long, help = "Number of entries (server caps at 100)")]
        limit: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let server = cli.server.clone().or_else(|| std::env::var("CRM_API_URL").ok());
    let client = CrmClient::open(config::session_file()?, server.as_deref())?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(&client, cmd, output_format).await,
        Commands::Leads { cmd } => commands::leads::handle(&client, cmd, output_format).await,
        Commands::Customers { cmd } => commands::customers::handle(&client, cmd, output_format).await,
        Commands::Tasks { cmd } => commands::tasks::handle(&client, cmd, output_format).await,
        Commands::Dashboard => commands::dashboard::handle(&client, output_format).await,
        Commands::Activity { limit } => commands::activity::handle(&client, limit, output_format).await,
    }
}
