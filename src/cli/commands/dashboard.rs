use serde_json::Value;

use crate::cli::utils::{cell, output_table};
use crate::cli::OutputFormat;
use crate::client::CrmClient;

pub async fn handle(client: &CrmClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let dashboard: Value = client.get("/api/dashboard", &[]).await?;
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    for (label, key) in [
        ("Leads", "totalLeads"),
        ("Customers", "customers"),
        ("Open tasks", "openTasks"),
        ("Overdue tasks", "overdueTasks"),
    ] {
        println!("{:>14}: {}", label, cell(dashboard.get(key)));
    }

    if let Some(statuses) = dashboard.get("leadsByStatus").and_then(Value::as_array) {
        println!();
        output_table(statuses, &["status", "count"]);
    }
    if let Some(days) = dashboard.get("leadsLast14Days").and_then(Value::as_array) {
        println!();
        output_table(days, &["date", "count"]);
    }
    Ok(())
}
