//! Access policy rules
//!
//! The rule order is not part of the rule object: it is changed through a
//! separate reorder call after the rule is saved, and only when it changed.

use super::numeric_string;
use reconcile::{
    ApiResult, AttributeStore, ChangeSet, EncodeMode, Field, MappingError, RemoteApi, RemoteObject, Resource,
    ResourceSchema, Scalar,
};
use validation::{
    Diagnostic, Diagnostics, SuffixKind, identifier, int_between, length_between, not_empty, string_in_slice,
};

const PATH: &str = "policySet/rule";

/// Operand object types accepted in rule conditions
const OBJECT_TYPES: &[&str] = &[
    "APP",
    "APP_GROUP",
    "CLIENT_TYPE",
    "IDP",
    "POSTURE",
    "SAML",
    "SCIM",
    "SCIM_GROUP",
    "TRUSTED_NETWORK",
];

#[derive(Debug)]
pub struct AccessRule {
    schema: ResourceSchema,
}

impl AccessRule {
    pub fn new() -> Self {
        let operand = ResourceSchema::new()
            .field(
                Field::string("object_type")
                    .required()
                    .validate_str(string_in_slice(OBJECT_TYPES)),
            )
            .field(Field::string("lhs").required().validate_str(not_empty))
            .field(Field::string("rhs"));
        let condition = ResourceSchema::new()
            .field(
                Field::string("operator")
                    .with_default("OR")
                    .validate_str(string_in_slice(&["AND", "OR"])),
            )
            .field(Field::bool("negated").with_default(false))
            .field(Field::block("operands", operand).items(1, 100));

        let schema = ResourceSchema::new()
            .field(Field::string("name").required().validate_str(length_between(1, 255)))
            .field(Field::string("description"))
            .field(
                Field::string("action")
                    .required()
                    .validate_str(string_in_slice(&["ALLOW", "DENY", "REQUIRE_APPROVAL"])),
            )
            .field(
                Field::int("rule_order")
                    .validate_int(int_between(1, 5000))
                    .custom()
                    .describe("Evaluation position; applied with a separate reorder call"),
            )
            .field(Field::bool("apply_to_everyone").conflicts_with(&["source_ids"]))
            .field(
                Field::set("source_ids", Scalar::String)
                    .validate_str(identifier(&["usr", "grp", "dpt"], SuffixKind::Numeric))
                    .conflicts_with(&["apply_to_everyone"])
                    .describe("Users, groups or departments the rule applies to (`grp-123`)"),
            )
            .field(Field::set("app_connector_group_ids", Scalar::String))
            .field(Field::string("custom_msg").validate_str(length_between(0, 1024)))
            .field(Field::block("conditions", condition))
            .field(Field::string("policy_type").computed());
        Self { schema }
    }
}

impl Resource for AccessRule {
    fn type_name(&self) -> &'static str {
        "access_rule"
    }

    fn api_path(&self) -> &'static str {
        PATH
    }

    fn description(&self) -> &'static str {
        "Access policy rule with conditions and evaluation order"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn validate_extra(&self, store: &AttributeStore) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if store.get_bool("apply_to_everyone") != Some(true) && !store.contains("source_ids") {
            diags.push(
                Diagnostic::warning(
                    "rule matches nobody",
                    "set apply_to_everyone or list source_ids, otherwise the rule never applies",
                )
                .at("source_ids"),
            );
        }
        diags
    }

    fn decode_custom(&self, remote: &RemoteObject, store: &mut AttributeStore) -> Result<(), MappingError> {
        match numeric_string(remote, "ruleOrder", "rule_order")? {
            Some(order) => store.set("rule_order", order.into()),
            None => {
                store.remove("rule_order");
            }
        }
        Ok(())
    }

    fn encode_custom(
        &self,
        _store: &AttributeStore,
        _payload: &mut RemoteObject,
        _mode: EncodeMode,
    ) -> Result<(), MappingError> {
        // rule_order is only ever set through the reorder endpoint
        Ok(())
    }

    fn follow_up_step(&self) -> &'static str {
        "rule reorder"
    }

    fn after_create(&self, api: &dyn RemoteApi, id: &str, store: &AttributeStore) -> ApiResult<()> {
        match store.get_int("rule_order") {
            Some(order) => api.put(&format!("{PATH}/{id}/reorder/{order}"), None),
            None => Ok(()),
        }
    }

    fn after_update(
        &self,
        api: &dyn RemoteApi,
        id: &str,
        store: &AttributeStore,
        changes: &ChangeSet,
    ) -> ApiResult<()> {
        if !changes.changed("rule_order") {
            return Ok(());
        }
        self.after_create(api, id, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{ApiError, Block, Error, Lifecycle, Method, MockApi, Value};
    use serde_json::json;

    fn operand(object_type: &str, lhs: &str, rhs: &str) -> Block {
        let mut b = Block::new();
        b.insert("object_type".into(), object_type.into());
        b.insert("lhs".into(), lhs.into());
        b.insert("rhs".into(), rhs.into());
        b
    }

    fn desired() -> AttributeStore {
        let mut condition = Block::new();
        condition.insert(
            "operands".into(),
            Value::blocks([operand("APP_GROUP", "id", "72058304855015574")]),
        );

        let mut store = AttributeStore::new();
        store.set("name", "allow engineering".into());
        store.set("action", "ALLOW".into());
        store.set("source_ids", Value::set(vec!["grp-42".into()]));
        store.set("conditions", Value::blocks([condition]));
        store
    }

    /// Simulates the server placing the rule at the requested position
    fn reorder(api: &MockApi, id: &str, order: i64) {
        api.patch(PATH, id, "ruleOrder", json!(order.to_string()));
    }

    #[test]
    fn test_nested_conditions_round_trip() {
        let api = MockApi::new();
        let mut store = desired();
        Lifecycle::new(&api).create(&AccessRule::new(), &mut store).unwrap();

        let body = api.calls_of(Method::Create)[0].body.clone().unwrap();
        assert_eq!(
            body["conditions"],
            json!([{
                "operator": "OR",
                "negated": false,
                "operands": [{"objectType": "APP_GROUP", "lhs": "id", "rhs": "72058304855015574"}]
            }])
        );
        assert!(body.get("ruleOrder").is_none());

        let mut expected = desired();
        AccessRule::new().schema().apply_defaults(&mut expected);
        assert_eq!(store.get("conditions"), expected.get("conditions"));
    }

    #[test]
    fn test_create_reorders_when_order_is_set() {
        let api = MockApi::new();
        let mut store = desired();
        store.set("rule_order", Value::Int(3));
        Lifecycle::new(&api).create(&AccessRule::new(), &mut store).unwrap();

        let puts = api.calls_of(Method::Put);
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].path, format!("{PATH}/{}/reorder/3", store.id().unwrap()));
    }

    #[test]
    fn test_update_reorders_only_on_change() {
        let api = MockApi::new();
        let rule = AccessRule::new();
        let mut prior = desired();
        prior.set("rule_order", Value::Int(3));
        Lifecycle::new(&api).create(&rule, &mut prior).unwrap();
        let id = prior.id().unwrap().to_string();
        reorder(&api, &id, 3);
        Lifecycle::new(&api).read(&rule, &mut prior).unwrap();
        assert_eq!(prior.get_int("rule_order"), Some(3));

        let mut renamed = desired();
        renamed.set("rule_order", Value::Int(3));
        renamed.set("name", "allow eng".into());
        Lifecycle::new(&api).update(&rule, &prior, &mut renamed).unwrap();
        assert_eq!(api.calls_of(Method::Put).len(), 1);

        let mut moved = desired();
        moved.set("rule_order", Value::Int(1));
        moved.set("name", "allow eng".into());
        Lifecycle::new(&api).update(&rule, &renamed, &mut moved).unwrap();
        let puts = api.calls_of(Method::Put);
        assert_eq!(puts.len(), 2);
        assert!(puts[1].path.ends_with("/reorder/1"));
    }

    #[test]
    fn test_failed_reorder_is_partial_success() {
        let api = MockApi::new();
        api.fail_next(
            Method::Put,
            ApiError::Http {
                status: 400,
                message: "invalid order".into(),
            },
        );
        let mut store = desired();
        store.set("rule_order", Value::Int(9));

        let err = Lifecycle::new(&api).create(&AccessRule::new(), &mut store).unwrap_err();
        assert!(matches!(err, Error::PartialSuccess { ref step, .. } if step == "rule reorder"));
        assert!(store.id().is_some());
        assert_eq!(api.len(PATH), 1);
    }

    #[test]
    fn test_everyone_conflicts_with_sources() {
        let mut store = desired();
        store.set("apply_to_everyone", true.into());
        let diags = AccessRule::new().schema().validate_config(&store);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, "conflicting configuration arguments");
    }

    #[test]
    fn test_validation_rejects_bad_identifiers_and_operands() {
        let mut store = desired();
        store.set("source_ids", Value::set(vec!["grp-abc".into(), "team-1".into()]));
        let mut condition = Block::new();
        condition.insert("operator".into(), "XOR".into());
        condition.insert("operands".into(), Value::blocks([operand("COUNTRY", "id", "US")]));
        store.set("conditions", Value::blocks([condition]));

        let diags = AccessRule::new().schema().validate_config(&store);
        let paths: Vec<String> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(
            paths,
            vec![
                "source_ids[0]".to_string(),
                "source_ids[1]".to_string(),
                "conditions[0].operator".to_string(),
                "conditions[0].operands[0].object_type".to_string(),
            ]
        );
    }

    #[test]
    fn test_rule_without_sources_warns() {
        let mut store = desired();
        store.remove("source_ids");
        let diags = AccessRule::new().validate_extra(&store);
        assert_eq!(diags.len(), 1);
        assert!(!diags.has_errors());
    }
}
