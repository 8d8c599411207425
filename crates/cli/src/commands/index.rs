//! Network index inspection

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use labeller_lib::MatchResolver;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_info, print_table, OutputFormat};

/// Row for the address table
#[derive(Tabled, Serialize)]
struct AddressRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Resources")]
    resources: String,
}

/// Build the network index and print it, optionally only some addresses
pub async fn show_index(
    resolver: &MatchResolver,
    addresses: &[String],
    format: OutputFormat,
) -> Result<()> {
    let stats = resolver
        .index()
        .rebuild(resolver.catalog(), Utc::now())
        .await;
    let index = resolver.index().snapshot().await;

    let rows: Vec<AddressRow> = index
        .entries()
        .into_iter()
        .filter(|(address, _)| addresses.is_empty() || addresses.iter().any(|a| a.as_str() == *address))
        .map(|(address, ids)| AddressRow {
            address: address.to_string(),
            resources: ids
                .iter()
                .map(|id| id.key().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    if format == OutputFormat::Table {
        println!("{}", "Network Index".bold());
        println!("{}", "=".repeat(60));
        print_info(&format!(
            "{} types listed, {} failed, {} resources with addresses",
            stats.types_listed, stats.types_failed, stats.resources_with_addresses
        ));
    }
    print_table(&rows, format);
    Ok(())
}
