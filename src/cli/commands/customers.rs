use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::{output_page, output_success};
use crate::cli::OutputFormat;
use crate::client::CrmClient;

#[derive(Subcommand)]
pub enum CustomerCommands {
    #[command(about = "List customers")]
    List {
        #[arg(long, help = "Search name, email or company")]
        q: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },

    #[command(about = "Add a note to a customer")]
    Note {
        #[arg(help = "Customer id")]
        id: String,
        #[arg(help = "Note text")]
        body: String,
    },
}

pub async fn handle(client: &CrmClient, cmd: CustomerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CustomerCommands::List { q, tag, page, limit } => {
            let query: Vec<(&str, String)> = [
                ("q", q),
                ("tag", tag),
                ("page", page.map(|p| p.to_string())),
                ("limit", limit.map(|l| l.to_string())),
            ]
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();
            let customers: Value = client.get("/api/customers", &query).await?;
            output_page(output_format, &customers, &["id", "name", "company", "tags", "notesCount"])
        }
        CustomerCommands::Note { id, body } => {
            let customer: Value = client
                .post(&format!("/api/customers/{}/notes", id), &json!({ "body": body }))
                .await?;
            let count = customer.get("notes").and_then(Value::as_array).map_or(0, Vec::len);
            output_success(
                output_format,
                &format!("Note added ({} total)", count),
                Some(json!({ "customer": customer })),
            )
        }
    }
}
