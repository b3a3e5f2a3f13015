//! Action API client
//!
//! [`KnowledgeBase`] is the set of primitives the reconciliation pipeline needs. The HTTP
//! implementation, [`WikibaseClient`], posts form-encoded requests and treats an `error` object
//! in a 200 response as a failure.
//!
//! Writes other than entity creation carry an edit token. The token is fetched on first use and
//! memoized for the life of the client; concurrent first writers share one fetch. In proxy mode
//! the local proxy authenticates, so requests carry `action_name` and no token is ever fetched.

use crate::claims::{ClaimMap, GetClaimsResponse};
use crate::datavalue::DataValue;
use crate::error::{Result, WikibaseError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;
use vpages_common::config::TomlConfig;

/// Revision id of an entity after a write
///
/// Not `Copy` or `Clone`: every write consumes the revision it is based on and returns the next
/// one, so a chain of writes cannot reuse a stale revision.
#[derive(Debug, PartialEq, Eq)]
pub struct Revision(u64);

impl Revision {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Claims of an entity restricted to one claim id
    async fn get_claims(&self, entity: &str, claim_id: &str) -> Result<ClaimMap>;

    /// Create a bare claim; returns the new claim id and revision
    async fn create_claim(
        &self,
        entity: &str,
        property: &str,
        value: &DataValue,
        base: Revision,
        summary: &str,
    ) -> Result<(String, Revision)>;

    async fn set_qualifier(
        &self,
        claim_id: &str,
        property: &str,
        value: &DataValue,
        base: Revision,
        summary: &str,
    ) -> Result<Revision>;

    /// Add a reference, or replace the one identified by `reference_hash`
    async fn set_reference(
        &self,
        claim_id: &str,
        snaks: &Value,
        reference_hash: Option<&str>,
        base: Revision,
        summary: &str,
    ) -> Result<Revision>;

    /// Latest revision of the page with `title`
    async fn latest_revision(&self, title: &str) -> Result<Revision>;
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    /// Host name used to build entity URLs
    pub server: String,
    /// Document index endpoint with a `{lang}` placeholder
    pub document_index_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub use_api_proxy: bool,
}

impl ClientConfig {
    pub fn from_toml(config: &TomlConfig) -> Self {
        Self {
            api_url: config.api_url(),
            server: config.server.clone(),
            document_index_url: config.document_index_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            use_api_proxy: config.use_api_proxy,
        }
    }
}

/// HTTP client for the Action API
pub struct WikibaseClient {
    http_client: reqwest::Client,
    config: ClientConfig,
    token: OnceCell<String>,
}

impl WikibaseClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| WikibaseError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            token: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Browser URL of an entity
    pub fn entity_url(&self, id: &str) -> String {
        format!("https://{}/wiki/{}", self.config.server, id)
    }

    /// Issue an action; `write` requests carry the edit token unless in proxy mode
    pub async fn request(
        &self,
        action: &str,
        params: &[(&str, String)],
        write: bool,
    ) -> Result<Value> {
        let mut form = self.form(action, params);
        if write && !self.config.use_api_proxy {
            form.push(("token".into(), self.edit_token().await?.to_string()));
        }

        tracing::debug!(action = %action, write, "API request");
        self.send(&form).await
    }

    fn form(&self, action: &str, params: &[(&str, String)]) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        form.push(("action".into(), action.into()));
        form.push(("format".into(), "json".into()));
        if self.config.use_api_proxy {
            form.push(("action_name".into(), action.into()));
        }
        form
    }

    async fn send(&self, form: &[(String, String)]) -> Result<Value> {
        let data = self.post_form(&self.config.api_url, form).await?;
        check_for_error(&data)?;
        Ok(data)
    }

    /// Edit token, fetched once
    pub async fn edit_token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                tracing::debug!("Fetching edit token");
                let form = self.form("query", &[("meta", "tokens".to_string())]);
                let data = self.send(&form).await?;
                data.pointer("/query/tokens/csrftoken")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| WikibaseError::Parse("No csrftoken in response".into()))
            })
            .await?;
        Ok(token.as_str())
    }

    /// GET a JSON document from an arbitrary endpoint (document index)
    pub(crate) async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| WikibaseError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Value> {
        let response = self
            .http_client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| WikibaseError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WikibaseError::Http {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| WikibaseError::Parse(e.to_string()))
    }

    /// `wbeditentity` with `new=item`; returns the new item id and its revision
    pub async fn create_entity(&self, data: &Value, summary: &str) -> Result<(String, Revision)> {
        let response = self
            .request(
                "wbeditentity",
                &[
                    ("new", "item".to_string()),
                    ("data", data.to_string()),
                    ("summary", summary.to_string()),
                ],
                false,
            )
            .await?;

        let id = response
            .pointer("/entity/id")
            .and_then(Value::as_str)
            .ok_or_else(|| WikibaseError::Parse("No entity.id in response".into()))?;
        let revision = response
            .pointer("/entity/lastrevid")
            .and_then(Value::as_u64)
            .ok_or_else(|| WikibaseError::Parse("No entity.lastrevid in response".into()))?;

        tracing::info!(item = %id, revision, "Created item");
        Ok((id.to_string(), Revision(revision)))
    }
}

/// Fail on an `error` object, which the API returns with HTTP 200
pub fn check_for_error(data: &Value) -> Result<()> {
    let Some(error) = data.get("error") else {
        return Ok(());
    };
    let code = error
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let mut info = error
        .get("info")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if let Some(detail) = error.get("*").and_then(Value::as_str) {
        info = format!("{}: {}", info, detail);
    }
    Err(WikibaseError::Api { code, info })
}

fn last_revision(data: &Value) -> Result<Revision> {
    data.pointer("/pageinfo/lastrevid")
        .and_then(Value::as_u64)
        .map(Revision)
        .ok_or_else(|| WikibaseError::Parse("No pageinfo.lastrevid in response".into()))
}

#[async_trait]
impl KnowledgeBase for WikibaseClient {
    async fn get_claims(&self, entity: &str, claim_id: &str) -> Result<ClaimMap> {
        let data = self
            .request(
                "wbgetclaims",
                &[("entity", entity.to_string()), ("claim", claim_id.to_string())],
                false,
            )
            .await?;
        let parsed: GetClaimsResponse =
            serde_json::from_value(data).map_err(|e| WikibaseError::Parse(e.to_string()))?;
        Ok(parsed.claims)
    }

    async fn create_claim(
        &self,
        entity: &str,
        property: &str,
        value: &DataValue,
        base: Revision,
        summary: &str,
    ) -> Result<(String, Revision)> {
        let data = self
            .request(
                "wbcreateclaim",
                &[
                    ("entity", entity.to_string()),
                    ("snaktype", "value".to_string()),
                    ("property", property.to_string()),
                    ("value", value.to_param()),
                    ("baserevid", base.to_string()),
                    ("summary", summary.to_string()),
                ],
                true,
            )
            .await?;

        let claim_id = data
            .pointer("/claim/id")
            .and_then(Value::as_str)
            .ok_or_else(|| WikibaseError::Parse("No claim.id in response".into()))?;
        Ok((claim_id.to_string(), last_revision(&data)?))
    }

    async fn set_qualifier(
        &self,
        claim_id: &str,
        property: &str,
        value: &DataValue,
        base: Revision,
        summary: &str,
    ) -> Result<Revision> {
        let data = self
            .request(
                "wbsetqualifier",
                &[
                    ("claim", claim_id.to_string()),
                    ("property", property.to_string()),
                    ("value", value.to_param()),
                    ("baseRevisionID", base.to_string()),
                    ("snaktype", "value".to_string()),
                    ("summary", summary.to_string()),
                ],
                true,
            )
            .await?;
        last_revision(&data)
    }

    async fn set_reference(
        &self,
        claim_id: &str,
        snaks: &Value,
        reference_hash: Option<&str>,
        base: Revision,
        summary: &str,
    ) -> Result<Revision> {
        let mut params = vec![
            ("statement", claim_id.to_string()),
            ("snaks", snaks.to_string()),
            ("baserevid", base.to_string()),
            ("summary", summary.to_string()),
        ];
        if let Some(hash) = reference_hash {
            params.push(("reference", hash.to_string()));
        }
        let data = self.request("wbsetreference", &params, true).await?;
        last_revision(&data)
    }

    async fn latest_revision(&self, title: &str) -> Result<Revision> {
        let data = self
            .request(
                "query",
                &[
                    ("prop", "revisions".to_string()),
                    ("titles", title.to_string()),
                ],
                false,
            )
            .await?;

        let pages = data
            .get("pages")
            .or_else(|| data.pointer("/query/pages"))
            .and_then(Value::as_object);

        pages
            .into_iter()
            .flat_map(|pages| pages.values())
            .filter(|page| page.get("title").and_then(Value::as_str) == Some(title))
            .find_map(|page| page.pointer("/revisions/0/revid").and_then(Value::as_u64))
            .map(Revision)
            .ok_or_else(|| WikibaseError::RevisionNotFound(title.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_for_error_passes_success() {
        assert!(check_for_error(&json!({"success": 1})).is_ok());
    }

    #[test]
    fn test_check_for_error_reads_payload() {
        let err = check_for_error(&json!({
            "error": {"code": "badtoken", "info": "Invalid CSRF token.", "*": "See docs"}
        }))
        .unwrap_err();
        match err {
            WikibaseError::Api { code, info } => {
                assert_eq!(code, "badtoken");
                assert_eq!(info, "Invalid CSRF token.: See docs");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_last_revision() {
        assert_eq!(
            last_revision(&json!({"pageinfo": {"lastrevid": 42}})).unwrap(),
            Revision::new(42)
        );
        assert!(last_revision(&json!({})).is_err());
    }
}
