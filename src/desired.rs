//! Desired-state files
//!
//! ```toml
//! [[resource]]
//! type = "segment_group"
//! name = "web"
//!
//! [resource.attributes]
//! name = "web servers"
//! enabled = true
//! ```

use crate::resource::Registry;
use anyhow::{Context, Result, bail};
use reconcile::{Address, Instance, decode_config};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use validation::Diagnostics;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DesiredFile {
    #[serde(default)]
    resource: Vec<ResourceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    attributes: toml::Table,
}

/// Read and decode a desired-state file
pub fn load(path: &Path, registry: &Registry) -> Result<Vec<Instance>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&content, registry).with_context(|| format!("Invalid desired-state file {}", path.display()))
}

/// Decode desired-state TOML into instances, in file order
///
/// Every entry is decoded before failing, so one error lists all problems.
pub fn parse(content: &str, registry: &Registry) -> Result<Vec<Instance>> {
    let file: DesiredFile = toml::from_str(content).context("Failed to parse TOML")?;

    let mut problems = Vec::new();
    let mut seen = BTreeSet::new();
    let mut instances = Vec::with_capacity(file.resource.len());

    for entry in file.resource {
        if entry.name.is_empty() || entry.name.contains('.') {
            problems.push(format!(
                "{}: instance name {:?} must be non-empty and contain no '.'",
                entry.kind, entry.name
            ));
            continue;
        }
        let address = Address::new(&entry.kind, &entry.name);
        if !seen.insert(address.clone()) {
            problems.push(format!("{address}: declared more than once"));
            continue;
        }
        let resource = match registry.require(&entry.kind) {
            Ok(r) => r,
            Err(e) => {
                problems.push(format!("{address}: {e}"));
                continue;
            }
        };

        let attrs = match serde_json::to_value(&entry.attributes)? {
            serde_json::Value::Object(map) => map,
            other => bail!("{address}: attributes must be a table, got {other}"),
        };
        match decode_config(resource.schema(), &attrs) {
            Ok(attributes) => instances.push(Instance {
                address,
                resource,
                attributes,
            }),
            Err(diags) => problems.extend(diags.iter().map(|d| format!("{address}: {d}"))),
        }
    }

    if !problems.is_empty() {
        bail!("{}", problems.join("\n"));
    }
    Ok(instances)
}

/// Run schema and cross-field validation on every instance
///
/// Returns each instance with diagnostics, warnings included.
pub fn validate(instances: &[Instance]) -> Vec<(Address, Diagnostics)> {
    instances
        .iter()
        .filter_map(|instance| {
            let mut diags = instance.resource.schema().validate_config(&instance.attributes);
            diags.extend(instance.resource.validate_extra(&instance.attributes));
            (!diags.is_empty()).then(|| (instance.address.clone(), diags))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::Value;

    const SITE: &str = r#"
[[resource]]
type = "segment_group"
name = "web"

[resource.attributes]
name = "web servers"
application_ids = ["2", "1"]
tcp_keep_alive = 1

[[resource]]
type = "application_segment"
name = "intranet"

[resource.attributes]
name = "intranet"
domain_names = ["intranet.example.com", "*.intranet.example.com"]
segment_group_id = "72058304855015574"
tcp_port_range = [{ from = 80, to = 80 }, { from = 8000, to = 8080 }]
"#;

    #[test]
    fn test_parse_in_file_order() {
        let instances = parse(SITE, &Registry::new()).unwrap();
        let addresses: Vec<String> = instances.iter().map(|i| i.address.to_string()).collect();
        assert_eq!(addresses, vec!["segment_group.web", "application_segment.intranet"]);

        let group = &instances[0].attributes;
        assert_eq!(group.get_int("tcp_keep_alive"), Some(1));
        assert_eq!(
            group.get("application_ids"),
            Some(&Value::List(vec!["2".into(), "1".into()]))
        );
        assert!(group.id().is_none());

        let segment = &instances[1].attributes;
        assert_eq!(segment.get("tcp_port_range").and_then(Value::as_items).map(<[Value]>::len), Some(2));
        assert!(validate(&instances).is_empty());
    }

    #[test]
    fn test_all_problems_reported_together() {
        let content = r#"
[[resource]]
type = "server_group"
name = "a"

[[resource]]
type = "segment_group"
name = "b"
[resource.attributes]
nmae = "typo"

[[resource]]
type = "segment_group"
name = "c"
[resource.attributes]
name = "c"

[[resource]]
type = "segment_group"
name = "c"
[resource.attributes]
name = "again"
"#;
        let err = parse(content, &Registry::new()).unwrap_err().to_string();
        assert!(err.contains("server_group.a: Unknown resource type"));
        assert!(err.contains("segment_group.b: nmae: unsupported argument"));
        assert!(err.contains("segment_group.c: declared more than once"));
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let content = r#"
[[resource]]
type = "segment_group"
name = "web"
[resource.attributes]
name = "web"
enabled = "yes"
"#;
        let err = parse(content, &Registry::new()).unwrap_err().to_string();
        assert!(err.contains("segment_group.web: enabled"));
    }

    #[test]
    fn test_dotted_names_are_rejected() {
        let content = "[[resource]]\ntype = \"segment_group\"\nname = \"a.b\"\n";
        assert!(parse(content, &Registry::new()).is_err());
    }

    #[test]
    fn test_validate_reports_schema_and_extra_checks() {
        let content = r#"
[[resource]]
type = "access_rule"
name = "deny"
[resource.attributes]
name = "deny all"
action = "BLOCK"
"#;
        let instances = parse(content, &Registry::new()).unwrap();
        let report = validate(&instances);
        assert_eq!(report.len(), 1);
        let (address, diags) = &report[0];
        assert_eq!(address.to_string(), "access_rule.deny");
        assert!(diags.has_errors());
        assert!(diags.iter().any(|d| !d.is_error()));
    }
}
