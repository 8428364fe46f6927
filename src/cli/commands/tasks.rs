use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::{output_page, output_record, output_success};
use crate::cli::OutputFormat;
use crate::client::CrmClient;

const COLUMNS: &[&str] = &["id", "title", "status", "priority", "dueDate", "overdue"];

#[derive(Subcommand)]
pub enum TaskCommands {
    #[command(about = "List tasks")]
    List {
        #[arg(long, help = "Filter by status (Todo, In Progress, Done)")]
        status: Option<String>,
        #[arg(long, help = "Only overdue tasks")]
        overdue: bool,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },

    #[command(about = "Create a task")]
    Create {
        #[arg(help = "Task title")]
        title: String,
        #[arg(long, help = "Low, Medium or High")]
        priority: Option<String>,
        #[arg(long, help = "Due date, RFC 3339")]
        due: Option<DateTime<Utc>>,
        #[arg(long, help = "Lead or Customer")]
        related_type: Option<String>,
        #[arg(long)]
        related_id: Option<String>,
    },

    #[command(about = "Mark a task as done")]
    Complete {
        #[arg(help = "Task id")]
        id: String,
    },
}

pub async fn handle(client: &CrmClient, cmd: TaskCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TaskCommands::List { status, overdue, page, limit } => {
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(("status", status));
            }
            if overdue {
                query.push(("overdue", "true".to_string()));
            }
            if let Some(page) = page {
                query.push(("page", page.to_string()));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            let tasks: Value = client.get("/api/tasks", &query).await?;
            output_page(output_format, &tasks, COLUMNS)
        }
        TaskCommands::Create { title, priority, due, related_type, related_id } => {
            let body = json!({
                "title": title,
                "priority": priority,
                "dueDate": due,
                "relatedType": related_type,
                "relatedId": related_id,
            });
            let task: Value = client.post("/api/tasks", &body).await?;
            output_record(output_format, &task, COLUMNS)
        }
        TaskCommands::Complete { id } => {
            let task: Value = client
                .patch(&format!("/api/tasks/{}", id), &json!({ "status": "Done" }))
                .await?;
            output_success(output_format, &format!("Task {} completed", id), Some(json!({ "task": task })))
        }
    }
}
