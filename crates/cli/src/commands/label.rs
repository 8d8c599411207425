//! Labelling of resolved resources

use anyhow::{bail, Result};
use colored::Colorize;
use labeller_lib::{
    LabelApplier, LabelOutcome, MatchResolver, MemoryResourceStore, ResourceCatalog,
    ResourceMatch,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::commands::resolve::print_matches;
use crate::output::{print_error, print_info, print_success, print_warning, OutputFormat};

/// Parse a `key=value` label argument
pub fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

/// Outcome counts for one label run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Apply `labels` to every match, printing one line per resource
pub async fn apply_all(
    applier: &LabelApplier,
    matches: &[ResourceMatch],
    labels: &BTreeMap<String, String>,
) -> LabelSummary {
    let mut summary = LabelSummary::default();
    for m in matches {
        let key = m.key().to_string();
        match applier.apply(&m.resource, labels).await {
            Ok(LabelOutcome::Updated) => {
                summary.updated += 1;
                print_success(&format!("{} labeled", key));
            }
            Ok(LabelOutcome::Unchanged) => {
                summary.unchanged += 1;
                print_info(&format!("{} already up to date", key));
            }
            Err(e) => {
                summary.failed += 1;
                print_error(&format!("{}: {}", key, e));
            }
        }
    }
    summary
}

/// Applier over an in-memory copy of the matched resources
///
/// Used for dry runs, so the outcome of each write can be reported without
/// touching the cluster.
pub async fn dry_run_applier(source: &ResourceCatalog, matches: &[ResourceMatch]) -> LabelApplier {
    let store = MemoryResourceStore::new();
    for m in matches {
        let descriptor = source.descriptor_for(&m.resource.identifier());
        store.insert(&descriptor, m.resource.clone()).await;
    }
    let catalog = ResourceCatalog::with_types(Arc::new(store), source.resource_types().to_vec());
    LabelApplier::new(catalog)
}

/// Resolve a target and merge labels into every match
pub async fn label(
    resolver: &MatchResolver,
    target: &str,
    labels: Vec<(String, String)>,
    addresses: &[String],
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    if labels.is_empty() {
        bail!("at least one --set key=value is required");
    }
    let labels: BTreeMap<String, String> = labels.into_iter().collect();

    let matches = resolver
        .resolve_by_name_with_network(target, addresses)
        .await;
    print_matches(target, &matches, format);
    if matches.is_empty() {
        return Ok(());
    }

    let applier = if dry_run {
        println!("\n{}", "Dry run: no changes will be written".yellow());
        dry_run_applier(resolver.catalog(), &matches).await
    } else {
        LabelApplier::new(resolver.catalog().clone())
    };

    let summary = apply_all(&applier, &matches, &labels).await;
    println!(
        "\n{} updated, {} unchanged, {} failed",
        summary.updated, summary.unchanged, summary.failed
    );
    if summary.failed > 0 {
        print_warning("Some resources could not be labeled");
    }
    Ok(())
}
