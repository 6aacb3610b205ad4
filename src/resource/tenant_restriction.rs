//! Tenant restriction profiles: limit SaaS sign-ins to approved tenants
//!
//! Exactly one provider block describes the restriction. Unlike identity
//! providers, the provider type can change in place.

use reconcile::{AttributeStore, Field, OneOf, Resource, ResourceSchema, Scalar};
use validation::{Diagnostic, Diagnostics, cidr, hostname, hostname_or_ipv4, length_between, not_empty, wildcard_hostname};

/// Provider block fields, in declaration order
const PROVIDERS: [&str; 3] = ["microsoft", "google", "slack"];

#[derive(Debug)]
pub struct TenantRestriction {
    schema: ResourceSchema,
    provider: OneOf,
}

fn others(name: &str) -> Vec<&'static str> {
    PROVIDERS.into_iter().filter(|p| *p != name).collect()
}

impl TenantRestriction {
    pub fn new() -> Self {
        let microsoft = ResourceSchema::new()
            .field(Field::set("tenant_ids", Scalar::String).validate_str(not_empty))
            .field(Field::set("tenant_domains", Scalar::String).validate_str(wildcard_hostname))
            .field(Field::bool("restrict_personal").with_default(false));
        let google = ResourceSchema::new()
            .field(Field::set("allowed_domains", Scalar::String).required().validate_str(hostname));
        let slack = ResourceSchema::new()
            .field(Field::set("workspace_ids", Scalar::String).validate_str(not_empty))
            .field(Field::set("allowed_domains", Scalar::String).validate_str(hostname));

        let schema = ResourceSchema::new()
            .field(Field::string("name").required().validate_str(length_between(1, 255)))
            .field(Field::string("description"))
            .field(Field::bool("enabled").with_default(true))
            .field(
                Field::set("source_cidrs", Scalar::String)
                    .validate_str(cidr)
                    .describe("Client networks the restriction applies to"),
            )
            .field(Field::string("proxy_hostname").validate_str(hostname_or_ipv4))
            .field(provider_block("microsoft", microsoft))
            .field(provider_block("google", google))
            .field(provider_block("slack", slack));
        let provider = OneOf::new("providerType")
            .branch("MICROSOFT", "microsoft", "microsoftConfig")
            .branch("GOOGLE", "google", "googleConfig")
            .branch("SLACK", "slack", "slackConfig");
        Self { schema, provider }
    }
}

fn provider_block(name: &'static str, schema: ResourceSchema) -> Field {
    Field::block(name, schema)
        .max_items(1)
        .conflicts_with(&others(name))
        .custom()
}

impl Resource for TenantRestriction {
    fn type_name(&self) -> &'static str {
        "tenant_restriction"
    }

    fn api_path(&self) -> &'static str {
        "tenantRestrictionProfile"
    }

    fn description(&self) -> &'static str {
        "SaaS tenant restriction for Microsoft, Google or Slack"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn one_of(&self) -> Option<&OneOf> {
        Some(&self.provider)
    }

    fn validate_extra(&self, store: &AttributeStore) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if self.provider.selected(store).is_none() {
            diags.push(Diagnostic::error(
                "missing provider",
                format!("exactly one of [{}] must be set", PROVIDERS.join(", ")),
            ));
        }
        let empty_microsoft = store
            .get("microsoft")
            .and_then(reconcile::Value::first_block)
            .is_some_and(|b| !b.contains_key("tenant_ids") && !b.contains_key("tenant_domains"));
        if empty_microsoft {
            diags.push(
                Diagnostic::error(
                    "missing tenant",
                    "set tenant_ids or tenant_domains to name the allowed tenants",
                )
                .at("microsoft[0]"),
            );
        }
        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Block, Lifecycle, Method, MockApi, ResourceExt, Value};
    use serde_json::json;

    fn microsoft() -> Value {
        let mut b = Block::new();
        b.insert("tenant_ids".into(), Value::set(vec!["contoso.onmicrosoft.com".into()]));
        Value::blocks([b])
    }

    fn google() -> Value {
        let mut b = Block::new();
        b.insert("allowed_domains".into(), Value::set(vec!["example.com".into()]));
        Value::blocks([b])
    }

    fn desired(branch: &str, value: Value) -> AttributeStore {
        let mut store = AttributeStore::new();
        store.set("name", "saas tenants".into());
        store.set("source_cidrs", Value::set(vec!["10.0.0.0/8".into()]));
        store.set(branch, value);
        store
    }

    #[test]
    fn test_every_provider_conflicts_with_the_others() {
        let restriction = TenantRestriction::new();
        restriction.check().unwrap();
        for name in PROVIDERS {
            let field = restriction.schema().get(name).unwrap();
            assert_eq!(field.conflicts_with.len(), 2);
            assert!(!field.conflicts_with.contains(&name));
        }
    }

    #[test]
    fn test_create_and_read_back() {
        let api = MockApi::new();
        let mut store = desired("microsoft", microsoft());
        Lifecycle::new(&api).create(&TenantRestriction::new(), &mut store).unwrap();

        let body = api.calls_of(Method::Create)[0].body.clone().unwrap();
        assert_eq!(body["providerType"], json!("MICROSOFT"));
        assert_eq!(body["microsoftConfig"]["tenantIds"], json!(["contoso.onmicrosoft.com"]));
        assert_eq!(body["microsoftConfig"]["restrictPersonal"], json!(false));
        assert_eq!(body["sourceCidrs"], json!(["10.0.0.0/8"]));

        let block = store.get("microsoft").and_then(Value::first_block).unwrap();
        assert_eq!(block.get("restrict_personal"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_provider_changes_in_place() {
        let api = MockApi::new();
        let restriction = TenantRestriction::new();
        let mut prior = desired("microsoft", microsoft());
        Lifecycle::new(&api).create(&restriction, &mut prior).unwrap();

        let mut next = desired("google", google());
        Lifecycle::new(&api).update(&restriction, &prior, &mut next).unwrap();

        let body = api.calls_of(Method::Update)[0].body.clone().unwrap();
        assert_eq!(body["providerType"], json!("GOOGLE"));
        assert_eq!(body["googleConfig"]["allowedDomains"], json!(["example.com"]));
        assert!(next.contains("google"));
    }

    #[test]
    fn test_provider_is_required() {
        let mut store = desired("microsoft", microsoft());
        store.remove("microsoft");
        let diags = TenantRestriction::new().validate_extra(&store);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, "missing provider");
    }

    #[test]
    fn test_microsoft_needs_a_tenant() {
        let mut block = Block::new();
        block.insert("restrict_personal".into(), Value::Bool(true));
        let store = desired("microsoft", Value::blocks([block]));
        let diags = TenantRestriction::new().validate_extra(&store);
        assert_eq!(diags.iter().next().unwrap().attribute.as_deref(), Some("microsoft[0]"));
    }

    #[test]
    fn test_two_providers_conflict() {
        let mut store = desired("microsoft", microsoft());
        store.set("slack", google());
        let diags = TenantRestriction::new().schema().validate_config(&store);
        let summaries: Vec<&str> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["conflicting configuration arguments"]);
    }

    #[test]
    fn test_network_validators() {
        let mut store = desired("google", google());
        store.set("source_cidrs", Value::set(vec!["10.0.0.0/33".into(), "192.168.0.0/16".into()]));
        store.set("proxy_hostname", "proxy .example.com".into());
        let diags = TenantRestriction::new().schema().validate_config(&store);
        let paths: Vec<String> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(paths, vec!["source_cidrs[0]".to_string(), "proxy_hostname".to_string()]);
    }
}
