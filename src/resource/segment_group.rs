//! Segment groups: named collections of application segments

use super::numeric_string;
use reconcile::{
    AttributeStore, EncodeMode, Field, MappingError, RemoteObject, Resource, ResourceSchema, Scalar,
};
use serde_json::Value as Json;
use validation::{int_between, length_between, string_in_slice};

/// Remote key of the keep-alive flag, sent as `"0"` or `"1"`
const KEEP_ALIVE_KEY: &str = "tcpKeepAliveEnabled";

#[derive(Debug)]
pub struct SegmentGroup {
    schema: ResourceSchema,
}

impl SegmentGroup {
    pub fn new() -> Self {
        let schema = ResourceSchema::new()
            .field(
                Field::string("name")
                    .required()
                    .validate_str(length_between(1, 255))
                    .describe("Name of the segment group"),
            )
            .field(Field::string("description"))
            .field(Field::bool("enabled").with_default(true))
            .field(
                Field::string("config_space")
                    .with_default("DEFAULT")
                    .validate_str(string_in_slice(&["DEFAULT", "SIEM"]))
                    .force_new(),
            )
            .field(
                Field::list("application_ids", Scalar::String)
                    .remote_name("appIds")
                    .describe("Application segments in this group, in display order"),
            )
            .field(
                Field::int("tcp_keep_alive")
                    .validate_int(int_between(0, 1))
                    .custom()
                    .describe("TCP keep-alive for segments in the group; unset keeps the server value"),
            )
            .field(Field::bool("policy_migrated").optional_computed())
            .field(Field::string("modified_time").computed());
        Self { schema }
    }
}

impl Resource for SegmentGroup {
    fn type_name(&self) -> &'static str {
        "segment_group"
    }

    fn api_path(&self) -> &'static str {
        "segmentGroup"
    }

    fn description(&self) -> &'static str {
        "Group of application segments referenced by access policy"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn decode_custom(&self, remote: &RemoteObject, store: &mut AttributeStore) -> Result<(), MappingError> {
        match numeric_string(remote, KEEP_ALIVE_KEY, "tcp_keep_alive")? {
            Some(n) => store.set("tcp_keep_alive", n.into()),
            None => {
                store.remove("tcp_keep_alive");
            }
        }
        Ok(())
    }

    fn encode_custom(
        &self,
        store: &AttributeStore,
        payload: &mut RemoteObject,
        _mode: EncodeMode,
    ) -> Result<(), MappingError> {
        if let Some(n) = store.get_int("tcp_keep_alive") {
            payload.insert(KEEP_ALIVE_KEY.into(), Json::String(n.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Lifecycle, Method, MockApi, Value};
    use serde_json::json;

    fn desired() -> AttributeStore {
        let mut store = AttributeStore::new();
        store.set("name", "web servers".into());
        store.set("application_ids", Value::List(vec!["2".into(), "1".into()]));
        store.set("tcp_keep_alive", Value::Int(0));
        store
    }

    #[test]
    fn test_create_sends_renamed_and_stringified_fields() {
        let api = MockApi::new();
        let mut store = desired();
        Lifecycle::new(&api).create(&SegmentGroup::new(), &mut store).unwrap();

        let body = api.calls_of(Method::Create)[0].body.clone().unwrap();
        assert_eq!(body["appIds"], json!(["2", "1"]));
        assert_eq!(body[KEEP_ALIVE_KEY], json!("0"));
        assert_eq!(body["configSpace"], json!("DEFAULT"));
        assert!(body.get("policyMigrated").is_none());
        assert!(body.get("applicationIds").is_none());

        assert_eq!(store.get_int("tcp_keep_alive"), Some(0));
        assert_eq!(
            store.get("application_ids"),
            Some(&Value::List(vec!["2".into(), "1".into()]))
        );
    }

    #[test]
    fn test_unset_keep_alive_is_omitted() {
        let api = MockApi::new();
        let mut store = desired();
        store.remove("tcp_keep_alive");
        Lifecycle::new(&api).create(&SegmentGroup::new(), &mut store).unwrap();

        let body = api.calls_of(Method::Create)[0].body.clone().unwrap();
        assert!(body.get(KEEP_ALIVE_KEY).is_none());
        assert!(!store.contains("tcp_keep_alive"));
    }

    #[test]
    fn test_server_keep_alive_is_decoded() {
        let api = MockApi::new();
        let mut store = desired();
        Lifecycle::new(&api).create(&SegmentGroup::new(), &mut store).unwrap();
        let id = store.id().unwrap().to_string();

        api.patch("segmentGroup", &id, KEEP_ALIVE_KEY, json!("1"));
        api.patch("segmentGroup", &id, "policyMigrated", json!(true));
        Lifecycle::new(&api).read(&SegmentGroup::new(), &mut store).unwrap();
        assert_eq!(store.get_int("tcp_keep_alive"), Some(1));
        assert_eq!(store.get_bool("policy_migrated"), Some(true));
    }

    #[test]
    fn test_keep_alive_out_of_range_is_rejected() {
        let mut store = desired();
        store.set("tcp_keep_alive", Value::Int(2));
        let diags = SegmentGroup::new().schema().validate_config(&store);
        assert!(diags.has_errors());
        assert_eq!(diags.iter().next().unwrap().attribute.as_deref(), Some("tcp_keep_alive"));
    }
}
