//! Identity provider profiles, authenticating users with SAML or OIDC
//!
//! The protocol is chosen at creation: the server ignores it on update, so
//! moving a profile to the other protocol replaces it.

use reconcile::{Field, OneOf, Resource, ResourceSchema, Scalar};
use validation::{email, length_between, not_empty, string_in_slice, url, wildcard_hostname};

#[derive(Debug)]
pub struct AuthProfile {
    schema: ResourceSchema,
    protocol: OneOf,
}

impl AuthProfile {
    pub fn new() -> Self {
        let saml = ResourceSchema::new()
            .field(Field::string("sso_url").required().validate_str(url))
            .field(Field::string("entity_id").required().validate_str(not_empty))
            .field(Field::string("signing_certificate").sensitive())
            .field(Field::bool("sign_request").with_default(false));
        let oidc = ResourceSchema::new()
            .field(Field::string("issuer").required().validate_str(url))
            .field(Field::string("client_id").required().validate_str(not_empty))
            .field(Field::string("client_secret").required().sensitive())
            .field(Field::set("scopes", Scalar::String));

        let schema = ResourceSchema::new()
            .field(Field::string("name").required().validate_str(length_between(1, 128)))
            .field(Field::string("description"))
            .field(Field::bool("enabled").with_default(true))
            .field(
                Field::set("domain_list", Scalar::String)
                    .validate_str(wildcard_hostname)
                    .describe("User domains authenticated by this provider"),
            )
            .field(
                Field::set("sso_type", Scalar::String)
                    .items(1, 2)
                    .validate_str(string_in_slice(&["USER", "ADMIN"])),
            )
            .field(Field::string("contact_email").validate_str(email))
            .field(
                Field::block("saml", saml)
                    .max_items(1)
                    .conflicts_with(&["oidc"])
                    .custom(),
            )
            .field(
                Field::block("oidc", oidc)
                    .max_items(1)
                    .conflicts_with(&["saml"])
                    .custom(),
            )
            .field(Field::string("login_url").computed());
        let protocol = OneOf::new("protocol")
            .branch("SAML", "saml", "samlConfig")
            .branch("OIDC", "oidc", "oidcConfig")
            .immutable();
        Self { schema, protocol }
    }
}

impl Resource for AuthProfile {
    fn type_name(&self) -> &'static str {
        "auth_profile"
    }

    fn api_path(&self) -> &'static str {
        "idp"
    }

    fn description(&self) -> &'static str {
        "Identity provider using SAML or OIDC"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn one_of(&self) -> Option<&OneOf> {
        Some(&self.protocol)
    }
}
