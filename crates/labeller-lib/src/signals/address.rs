//! Network address extraction
//!
//! Where a resource publishes its addresses depends on the provider family,
//! so extraction dispatches on (group, kind). Kinds without a dedicated
//! extractor fall back to the common `status.atProvider` fields.

use crate::document::Document;
use crate::models::{parse_api_version, ManagedResource};
use tracing::debug;

const COMPUTE_GROUP: &str = "compute.gcp.upbound.io";
const SQL_GROUP: &str = "sql.gcp.upbound.io";
const REDIS_GROUP: &str = "redis.gcp.upbound.io";
const SPANNER_GROUP: &str = "spanner.gcp.upbound.io";

const COMPUTE_DIRECT_FIELDS: [&str; 3] = ["ipAddress", "privateIpAddress", "publicIpAddress"];
const INTERFACE_FIELDS: [&str; 2] = ["networkIP", "ipAddress"];
const SQL_CONNECTION_FIELDS: [&str; 5] = ["connectionName", "host", "endpoint", "uri", "connectionString"];
const AT_PROVIDER_FIELDS: [&str; 5] = ["ipAddress", "ip", "address", "host", "endpoint"];
const ADDRESS_ENTRY_FIELDS: [&str; 3] = ["ip", "ipAddress", "address"];

/// Loose dotted-quad check: four non-empty groups of at most three digits
///
/// Octet values are not range-checked.
pub fn looks_like_ipv4(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.len() <= 3 && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Harvest dotted-quad tokens from a connection string
pub fn addresses_in_connection_string(conn: &str) -> Vec<String> {
    conn.split(|c| matches!(c, ':' | '/' | '@' | ','))
        .map(str::trim)
        .filter(|part| looks_like_ipv4(part))
        .map(str::to_string)
        .collect()
}

/// All network addresses a resource advertises, de-duplicated in
/// first-seen order
pub fn extract_addresses(resource: &ManagedResource) -> Vec<String> {
    let (group, _) = parse_api_version(&resource.api_version);
    let mut found = Vec::new();

    match (group.as_str(), resource.kind.as_str()) {
        (COMPUTE_GROUP, "Instance") => compute_instance(resource, &mut found),
        (SQL_GROUP, "DatabaseInstance") => sql_instance(resource, &mut found),
        (REDIS_GROUP, "Instance") => redis_instance(resource, &mut found),
        // Spanner is reached through Google APIs, never a private address
        (SPANNER_GROUP, "Instance") => {}
        _ => at_provider_fallback(resource, &mut found),
    }

    let mut unique: Vec<String> = Vec::with_capacity(found.len());
    for address in found {
        if !unique.contains(&address) {
            unique.push(address);
        }
    }
    unique
}

fn compute_instance(resource: &ManagedResource, out: &mut Vec<String>) {
    let Some(for_provider) = resource.for_provider() else {
        return;
    };

    for field in COMPUTE_DIRECT_FIELDS {
        if let Some(ip) = for_provider.str_field(field) {
            out.push(ip.to_string());
        }
    }

    let interfaces = for_provider
        .get("networkInterfaces")
        .and_then(Document::as_list)
        .unwrap_or_default();
    for interface in interfaces {
        for field in INTERFACE_FIELDS {
            if let Some(ip) = interface.str_field(field) {
                out.push(ip.to_string());
            }
        }

        let access_configs = interface
            .get("accessConfigs")
            .and_then(Document::as_list)
            .unwrap_or_default();
        for config in access_configs {
            if let Some(ip) = config.str_field("natIP") {
                out.push(ip.to_string());
            }
        }
    }
}

fn sql_instance(resource: &ManagedResource, out: &mut Vec<String>) {
    let Some(for_provider) = resource.for_provider() else {
        return;
    };

    if let Some(network) = for_provider
        .path(&["settings", "ipConfiguration", "privateNetwork"])
        .and_then(Document::as_str)
        .filter(|s| !s.is_empty())
    {
        let network_name = network.rsplit('/').next().unwrap_or(network);
        debug!(instance = %resource.name, network = %network_name, "SQL instance on private network");
    }

    for (key, value) in for_provider.as_map().into_iter().flatten() {
        match value {
            Document::String(s) if looks_like_ipv4(s) => {
                debug!(resource = %resource.name, field = %key, ip = %s, "Found IP in field");
                out.push(s.clone());
            }
            Document::Map(nested) => {
                for (sub_key, sub_value) in nested {
                    if let Some(s) = sub_value.as_str().filter(|s| looks_like_ipv4(s)) {
                        debug!(
                            resource = %resource.name,
                            field = %format!("{}.{}", key, sub_key),
                            ip = %s,
                            "Found IP in nested field"
                        );
                        out.push(s.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    for field in SQL_CONNECTION_FIELDS {
        if let Some(conn) = for_provider.str_field(field) {
            out.extend(addresses_in_connection_string(conn));
        }
    }
}

fn redis_instance(resource: &ManagedResource, out: &mut Vec<String>) {
    let Some(for_provider) = resource.for_provider() else {
        return;
    };

    if let Some(host) = for_provider.str_field("host") {
        out.push(host.to_string());
    }
    if let Some(auth) = for_provider.str_field("authString") {
        out.extend(addresses_in_connection_string(auth));
    }
}

fn at_provider_fallback(resource: &ManagedResource, out: &mut Vec<String>) {
    let Some(at_provider) = resource.at_provider() else {
        return;
    };

    for field in AT_PROVIDER_FIELDS {
        if let Some(ip) = at_provider.str_field(field).filter(|s| looks_like_ipv4(s)) {
            out.push(ip.to_string());
        }
    }

    let entries = at_provider
        .get("addresses")
        .and_then(Document::as_list)
        .unwrap_or_default();
    for entry in entries {
        match entry {
            Document::Map(_) => {
                for field in ADDRESS_ENTRY_FIELDS {
                    if let Some(ip) = entry.str_field(field).filter(|s| looks_like_ipv4(s)) {
                        out.push(ip.to_string());
                    }
                }
            }
            Document::String(s) if looks_like_ipv4(s) => out.push(s.clone()),
            _ => {}
        }
    }
}
