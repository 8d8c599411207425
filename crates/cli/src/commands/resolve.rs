//! Resolution of a workload to its managed resources

use anyhow::Result;
use colored::Colorize;
use labeller_lib::{MatchResolver, ResourceMatch};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{color_confidence, color_source, print_json, print_warning, OutputFormat};

/// JSON view of a match; the full resource document is left out
#[derive(Serialize)]
pub struct MatchView<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub api_version: &'a str,
    pub confidence: f64,
    pub source: &'a str,
    pub reasons: &'a [String],
}

impl<'a> From<&'a ResourceMatch> for MatchView<'a> {
    fn from(m: &'a ResourceMatch) -> Self {
        Self {
            kind: &m.resource.kind,
            name: &m.resource.name,
            api_version: &m.resource.api_version,
            confidence: m.confidence,
            source: m.source.as_str(),
            reasons: &m.reasons,
        }
    }
}

/// Row for the matches table
#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Reasons")]
    reasons: String,
}

/// Print matches in the requested format
pub fn print_matches(target: &str, matches: &[ResourceMatch], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let views: Vec<MatchView> = matches.iter().map(MatchView::from).collect();
            print_json(&views);
        }
        OutputFormat::Table => {
            println!("{} {}", "Matches for".bold(), target.cyan());
            println!("{}", "=".repeat(60));

            if matches.is_empty() {
                print_warning("No managed resources matched");
                return;
            }

            let rows: Vec<MatchRow> = matches
                .iter()
                .map(|m| MatchRow {
                    kind: m.resource.kind.clone(),
                    name: m.resource.name.clone(),
                    confidence: color_confidence(m.confidence),
                    source: color_source(m.source.as_str()),
                    reasons: m.reasons.join("\n"),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} matches", matches.len());
        }
    }
}

/// Resolve a target name, optionally with workload addresses
pub async fn resolve(
    resolver: &MatchResolver,
    target: &str,
    addresses: &[String],
    format: OutputFormat,
) -> Result<()> {
    let matches = resolver
        .resolve_by_name_with_network(target, addresses)
        .await;
    print_matches(target, &matches, format);
    Ok(())
}
