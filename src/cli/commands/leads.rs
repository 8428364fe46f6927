use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::{output_page, output_record, output_success};
use crate::cli::OutputFormat;
use crate::client::CrmClient;

const COLUMNS: &[&str] = &["id", "name", "company", "status", "source", "archived"];

#[derive(Subcommand)]
pub enum LeadCommands {
    #[command(about = "List leads, newest first")]
    List {
        #[arg(long, help = "Filter by status (New, In Progress, Closed Won, Closed Lost)")]
        status: Option<String>,
        #[arg(long, help = "Search name, email or company")]
        q: Option<String>,
        #[arg(long, help = "Include archived leads")]
        archived: bool,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },

    #[command(about = "Create a lead")]
    Create {
        #[arg(help = "Lead name")]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },

    #[command(about = "Convert a lead into a customer")]
    Convert {
        #[arg(help = "Lead id")]
        id: String,
    },

    #[command(about = "Archive a lead")]
    Archive {
        #[arg(help = "Lead id")]
        id: String,
    },
}

pub async fn handle(client: &CrmClient, cmd: LeadCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        LeadCommands::List { status, q, archived, page, limit } => {
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(("status", status));
            }
            if let Some(q) = q {
                query.push(("q", q));
            }
            if archived {
                query.push(("archived", "true".to_string()));
            }
            if let Some(page) = page {
                query.push(("page", page.to_string()));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            let leads: Value = client.get("/api/leads", &query).await?;
            output_page(output_format, &leads, COLUMNS)
        }
        LeadCommands::Create { name, email, phone, company, source } => {
            let body = json!({
                "name": name,
                "email": email,
                "phone": phone,
                "company": company,
                "source": source,
            });
            let lead: Value = client.post("/api/leads", &body).await?;
            output_record(output_format, &lead, COLUMNS)
        }
        LeadCommands::Convert { id } => {
            let result: Value = client.post(&format!("/api/leads/{}/convert", id), &json!({})).await?;
            let customer = result.get("customer").cloned().unwrap_or(Value::Null);
            output_success(
                output_format,
                &format!("Lead converted; customer {}", crate::cli::utils::cell(customer.get("id"))),
                Some(result),
            )
        }
        LeadCommands::Archive { id } => {
            let lead = client.delete(&format!("/api/leads/{}", id)).await?.unwrap_or(Value::Null);
            output_success(output_format, &format!("Lead {} archived", id), Some(json!({ "lead": lead })))
        }
    }
}
