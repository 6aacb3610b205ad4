//! Application segments: the domains and ports users reach through the
//! platform

use reconcile::{
    AttributeStore, Block, EncodeMode, Field, MappingError, RemoteObject, Resource, ResourceSchema, Scalar,
    Value,
};
use serde_json::Value as Json;
use validation::{
    Diagnostic, Diagnostics, any_of, boxed, hostname_or_ipv4, not_empty, port, string_in_slice,
    wildcard_hostname,
};

/// Port range fields: local block name and remote flat-list key
const PORT_RANGES: [(&str, &str); 2] = [("tcp_port_range", "tcpPortRanges"), ("udp_port_range", "udpPortRanges")];

#[derive(Debug)]
pub struct ApplicationSegment {
    schema: ResourceSchema,
}

fn port_range_schema() -> ResourceSchema {
    ResourceSchema::new()
        .field(Field::int("from").required().validate_int(port))
        .field(Field::int("to").required().validate_int(port))
}

impl ApplicationSegment {
    pub fn new() -> Self {
        let schema = ResourceSchema::new()
            .field(Field::string("name").required().validate_str(not_empty))
            .field(Field::string("description"))
            .field(Field::bool("enabled").with_default(true))
            .field(
                Field::set("domain_names", Scalar::String)
                    .required()
                    .items(1, 2000)
                    .validate_str(any_of::<str>(vec![boxed(wildcard_hostname), boxed(hostname_or_ipv4)])),
            )
            .field(Field::string("segment_group_id").required().validate_str(not_empty))
            .field(Field::set("server_group_ids", Scalar::String))
            .field(Field::block("tcp_port_range", port_range_schema()).custom())
            .field(Field::block("udp_port_range", port_range_schema()).custom())
            .field(
                Field::string("bypass_type")
                    .with_default("NEVER")
                    .validate_str(string_in_slice(&["ALWAYS", "NEVER", "ON_NET"])),
            )
            .field(
                Field::string("health_reporting")
                    .with_default("ON_ACCESS")
                    .validate_str(string_in_slice(&["NONE", "ON_ACCESS", "CONTINUOUS"])),
            )
            .field(
                Field::string("icmp_access_type")
                    .with_default("NONE")
                    .validate_str(string_in_slice(&["PING_TRACEROUTING", "PING", "NONE"])),
            )
            .field(Field::bool("double_encrypt").with_default(false).force_new())
            .field(Field::bool("is_cname_enabled").with_default(true))
            .field(
                Field::string("access_mode")
                    .with_default("PROXY")
                    .validate_str(string_in_slice(&["PROXY", "DIRECT"])),
            )
            .field(
                Field::string("host_header")
                    .optional_computed()
                    .describe("Host header sent to the server; the server derives it in DIRECT mode"),
            );
        Self { schema }
    }
}

impl Resource for ApplicationSegment {
    fn type_name(&self) -> &'static str {
        "application_segment"
    }

    fn api_path(&self) -> &'static str {
        "application"
    }

    fn description(&self) -> &'static str {
        "Domains and port ranges published to users"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn validate_extra(&self, store: &AttributeStore) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let mut any_range = false;
        for (field, _) in PORT_RANGES {
            let Some(Value::List(items)) = store.get(field) else {
                continue;
            };
            for (i, item) in items.iter().enumerate() {
                any_range = true;
                let Some(block) = item.as_block() else {
                    continue;
                };
                if let (Some(from), Some(to)) = (bound(block, "from"), bound(block, "to"))
                    && from > to
                {
                    diags.push(
                        Diagnostic::error(
                            "invalid port range",
                            format!("range start {from} is greater than range end {to}"),
                        )
                        .at(&format!("[{i}]"))
                        .at(field),
                    );
                }
            }
        }
        if !any_range {
            diags.push(Diagnostic::error(
                "missing port range",
                "at least one of tcp_port_range or udp_port_range must be set",
            ));
        }
        diags
    }

    fn decode_custom(&self, remote: &RemoteObject, store: &mut AttributeStore) -> Result<(), MappingError> {
        for (field, key) in PORT_RANGES {
            store.set(field, decode_ranges(remote, key, field)?);
        }
        Ok(())
    }

    fn encode_custom(
        &self,
        store: &AttributeStore,
        payload: &mut RemoteObject,
        mode: EncodeMode,
    ) -> Result<(), MappingError> {
        for (field, key) in PORT_RANGES {
            let flat: Vec<Json> = store
                .get(field)
                .and_then(Value::as_items)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_block)
                .filter_map(|b| Some((bound(b, "from")?, bound(b, "to")?)))
                .flat_map(|(from, to)| [Json::String(from.to_string()), Json::String(to.to_string())])
                .collect();
            payload.insert(key.into(), Json::Array(flat));
        }

        // The server rewrites the host header in direct mode and rejects the
        // stale value on update.
        if mode == EncodeMode::Update && store.get_str("access_mode") == Some("DIRECT") {
            payload.insert("hostHeader".into(), Json::String(String::new()));
        }
        Ok(())
    }
}

fn bound(block: &Block, key: &str) -> Option<i64> {
    block.get(key).and_then(Value::as_int)
}

/// `["80", "80", "8000", "8080"]` -> two `{from, to}` blocks
fn decode_ranges(remote: &RemoteObject, key: &str, field: &str) -> Result<Value, MappingError> {
    let items = match remote.get(key) {
        None | Some(Json::Null) => return Ok(Value::List(Vec::new())),
        Some(Json::Array(items)) => items,
        Some(_) => return Err(MappingError::new(field, format!("{key} must be a list"))),
    };
    if items.len() % 2 != 0 {
        return Err(MappingError::new(
            field,
            format!("{key} has {} entries, expected start/end pairs", items.len()),
        ));
    }

    let number = |i: usize| -> Result<i64, MappingError> {
        match &items[i] {
            Json::String(s) => s.parse().ok(),
            Json::Number(n) => n.as_i64(),
            _ => None,
        }
        .ok_or_else(|| MappingError::new(format!("{field}[{}]", i / 2), format!("invalid port {}", items[i])))
    };

    let mut blocks = Vec::with_capacity(items.len() / 2);
    for i in (0..items.len()).step_by(2) {
        let mut block = Block::new();
        block.insert("from".into(), Value::Int(number(i)?));
        block.insert("to".into(), Value::Int(number(i + 1)?));
        blocks.push(block);
    }
    Ok(Value::blocks(blocks))
}
