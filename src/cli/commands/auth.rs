use clap::Subcommand;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

use crate::cli::utils::{output_record, output_success};
use crate::cli::OutputFormat;
use crate::client::CrmClient;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout and revoke the refresh token")]
    Logout,

    #[command(about = "Show the stored session without contacting the server")]
    Status,

    #[command(about = "Show current user information")]
    Whoami,
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn handle(client: &CrmClient, cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let session = client.login(&email, &password).await?;
            output_success(
                output_format,
                &format!("Logged in as {} ({}) on {}", session.user.name, session.user.role, session.server),
                Some(json!({ "user": session.user })),
            )
        }
        AuthCommands::Logout => {
            client.logout().await?;
            output_success(output_format, "Logged out", None)
        }
        AuthCommands::Status => match client.session().await {
            Some(session) => output_success(
                output_format,
                &format!("Logged in as {} <{}> on {}", session.user.name, session.user.email, session.server),
                Some(json!({ "server": session.server, "user": session.user })),
            ),
            None => output_success(
                output_format,
                &format!("Not logged in to {}", client.server()),
                Some(json!({ "server": client.server().as_str(), "user": null })),
            ),
        },
        AuthCommands::Whoami => {
            let me: Value = client.get("/api/auth/me", &[]).await?;
            output_record(output_format, &me, &["id", "name", "email", "role", "active"])
        }
    }
}
