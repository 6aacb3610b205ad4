//! HTTP transport for the management API.

use crate::auth::{self, Token};
use log::debug;
use reconcile::{ApiError, ApiResult, RemoteApi, RemoteObject};
use serde_json::Value as Json;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};

/// Prefix of every management endpoint.
const API_PREFIX: &str = "mgmtconfig/v1/admin/customers";

/// HTTP methods that carry a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Write {
    Post,
    Put,
}

impl Write {
    fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// Connection settings for [`RestClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub customer_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Scope every call to one microtenant
    pub microtenant_id: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        customer_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            customer_id: customer_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            microtenant_id: None,
            timeout: Duration::from_secs(30),
            user_agent: concat!("zpa/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Blocking client for the management API.
///
/// Safe to share between threads: the agent pools connections and the
/// bearer token is cached behind a mutex.
pub struct RestClient {
    config: ClientConfig,
    agent: Agent,
    token: Mutex<Option<Token>>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.config.base_url)
            .field("customer_id", &self.config.customer_id)
            .field("microtenant_id", &self.config.microtenant_id)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a client; no request is made until the first call.
    pub fn new(config: ClientConfig) -> Self {
        // Status codes are classified by hand so 404 stays distinguishable.
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self {
            config,
            agent,
            token: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full URL for a collection path, optionally addressing one object
    pub fn endpoint(&self, path: &str, id: Option<&str>) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_matches('/');
        let mut url = format!("{base}/{API_PREFIX}/{}/{path}", self.config.customer_id);
        if let Some(id) = id {
            url.push('/');
            url.push_str(id);
        }
        url
    }

    fn sign_in_url(&self) -> String {
        format!("{}/signin", self.config.base_url.trim_end_matches('/'))
    }

    /// Current bearer header, signing in when the cached token is stale
    fn authorization(&self) -> ApiResult<String> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.header());
        }

        debug!("Signing in to {}", self.config.base_url);
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self
            .agent
            .post(&self.sign_in_url())
            .header("User-Agent", &self.config.user_agent)
            .send_form(form)
            .map_err(transport)?;
        let body = read_body(response)?;
        let token = auth::parse_sign_in(&body)?;
        let header = token.header();
        *cached = Some(token);
        Ok(header)
    }

    fn query(&self) -> Vec<(&str, &str)> {
        self.config
            .microtenant_id
            .as_deref()
            .map(|m| vec![("microtenantId", m)])
            .unwrap_or_default()
    }

    fn fetch(&self, url: &str) -> ApiResult<String> {
        let response = self
            .agent
            .get(url)
            .query_pairs(self.query())
            .header("Authorization", &self.authorization()?)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "application/json")
            .call()
            .map_err(transport)?;
        read_body(response)
    }

    fn send(&self, method: Write, url: &str, body: Option<&Json>) -> ApiResult<String> {
        debug!("{} {url}", method.as_str());
        let auth = self.authorization()?;
        let builder = match method {
            Write::Post => self.agent.post(url),
            Write::Put => self.agent.put(url),
        }
        .query_pairs(self.query())
        .header("Authorization", &auth)
        .header("User-Agent", &self.config.user_agent)
        .header("Accept", "application/json");

        let response = match body {
            Some(json) => builder.send_json(json),
            None => builder.send_empty(),
        }
        .map_err(transport)?;
        read_body(response)
    }

    fn remove(&self, url: &str) -> ApiResult<String> {
        let response = self
            .agent
            .delete(url)
            .query_pairs(self.query())
            .header("Authorization", &self.authorization()?)
            .header("User-Agent", &self.config.user_agent)
            .call()
            .map_err(transport)?;
        read_body(response)
    }
}

impl RemoteApi for RestClient {
    fn create(&self, path: &str, payload: &RemoteObject) -> ApiResult<RemoteObject> {
        let url = self.endpoint(path, None);
        let body = self.send(Write::Post, &url, Some(&Json::Object(payload.clone())))?;
        parse_object(&body)
    }

    fn get(&self, path: &str, id: &str) -> ApiResult<RemoteObject> {
        let url = self.endpoint(path, Some(id));
        debug!("GET {url}");
        parse_object(&self.fetch(&url)?)
    }

    fn update(&self, path: &str, id: &str, payload: &RemoteObject) -> ApiResult<Option<RemoteObject>> {
        let url = self.endpoint(path, Some(id));
        let body = self.send(Write::Put, &url, Some(&Json::Object(payload.clone())))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        parse_object(&body).map(Some)
    }

    fn delete(&self, path: &str, id: &str) -> ApiResult<()> {
        let url = self.endpoint(path, Some(id));
        debug!("DELETE {url}");
        self.remove(&url).map(drop)
    }

    fn put(&self, path: &str, body: Option<&Json>) -> ApiResult<()> {
        let url = self.endpoint(path, None);
        self.send(Write::Put, &url, body).map(drop)
    }
}

fn transport(err: ureq::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

fn read_body(mut response: Response<Body>) -> ApiResult<String> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    classify(status, body)
}

/// Map an HTTP status to the collaborator error contract
///
/// 404 is the only drift signal; every other non-2xx status keeps the
/// response body as its message.
pub fn classify(status: u16, body: String) -> ApiResult<String> {
    match status {
        200..=299 => Ok(body),
        404 => Err(ApiError::NotFound),
        _ => {
            let message = if body.trim().is_empty() {
                "no response body".to_string()
            } else {
                body
            };
            Err(ApiError::Http { status, message })
        }
    }
}

fn parse_object(body: &str) -> ApiResult<RemoteObject> {
    match serde_json::from_str::<Json>(body) {
        Ok(Json::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::Decode(format!("expected a JSON object, got {other}"))),
        Err(e) => Err(ApiError::Decode(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RestClient {
        RestClient::new(ClientConfig::new(
            "https://config.private.zscaler.com/",
            "216196257331281920",
            "id",
            "secret",
        ))
    }

    #[test]
    fn test_write_methods() {
        assert_eq!(Write::Post.as_str(), "POST");
        assert_eq!(Write::Put.as_str(), "PUT");
        assert_ne!(Write::Post, Write::Put);
    }

    #[test]
    fn test_endpoint() {
        let c = client();
        assert_eq!(
            c.endpoint("segmentGroup", None),
            "https://config.private.zscaler.com/mgmtconfig/v1/admin/customers/216196257331281920/segmentGroup"
        );
        assert_eq!(
            c.endpoint("/application/", Some("42")),
            "https://config.private.zscaler.com/mgmtconfig/v1/admin/customers/216196257331281920/application/42"
        );
        assert_eq!(c.sign_in_url(), "https://config.private.zscaler.com/signin");
    }

    #[test]
    fn test_microtenant_query() {
        assert!(client().query().is_empty());

        let mut config = client().config().clone();
        config.microtenant_id = Some("7".into());
        let scoped = RestClient::new(config);
        assert_eq!(scoped.query(), vec![("microtenantId", "7")]);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(200, "{}".into()), Ok("{}".to_string()));
        assert_eq!(classify(204, String::new()), Ok(String::new()));
        assert_eq!(classify(404, "missing".into()), Err(ApiError::NotFound));
        assert_eq!(
            classify(409, "conflict".into()),
            Err(ApiError::Http {
                status: 409,
                message: "conflict".into()
            })
        );
        assert_eq!(
            classify(500, " ".into()),
            Err(ApiError::Http {
                status: 500,
                message: "no response body".into()
            })
        );
    }

    #[test]
    fn test_parse_object() {
        let obj = parse_object(r#"{"id":"1","name":"web"}"#).unwrap();
        assert_eq!(obj["name"], "web");
        assert!(matches!(parse_object("[1]"), Err(ApiError::Decode(_))));
        assert!(matches!(parse_object("nope"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_debug_hides_secret() {
        let text = format!("{:?}", client());
        assert!(text.contains("216196257331281920"));
        assert!(!text.contains("secret"));
    }
}
