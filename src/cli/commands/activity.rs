use serde_json::Value;

use crate::cli::utils::output_table;
use crate::cli::OutputFormat;
use crate::client::CrmClient;

pub async fn handle(client: &CrmClient, limit: Option<u32>, output_format: OutputFormat) -> anyhow::Result<()> {
    let query: Vec<(&str, String)> = limit.map(|l| ("limit", l.to_string())).into_iter().collect();
    let entries: Vec<Value> = client.get("/api/activity", &query).await?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text if entries.is_empty() => println!("No activity yet"),
        OutputFormat::Text => output_table(&entries, &["createdAt", "actorName", "type", "message"]),
    }
    Ok(())
}
