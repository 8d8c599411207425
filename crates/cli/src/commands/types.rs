//! Watched resource type listing

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_table, OutputFormat};

/// Row for the resource types table
#[derive(Tabled, Serialize)]
struct TypeRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Resource")]
    plural: String,
    #[tabled(rename = "Kind")]
    kind: String,
}

/// List the compiled-in resource collections
pub fn list_types(format: OutputFormat) -> Result<()> {
    let rows: Vec<TypeRow> = labeller_lib::catalog::resource_types()
        .into_iter()
        .map(|d| TypeRow {
            group: d.group,
            version: d.version,
            plural: d.plural,
            kind: d.kind,
        })
        .collect();

    print_table(&rows, format);
    Ok(())
}
