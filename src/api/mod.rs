//! REST access.
//!
//! - [`ApiClient`]: the fetch wrapper (token, JSON, `ApiError`)
//! - [`AccountApi`]: authentication and the user's organization units
//! - [`TenantApi`]: everything under `/{tenant}/api/...`, one file per
//!   resource

pub mod account;
mod admin;
mod agents;
mod assets;
pub mod client;
mod executions;
mod packages;
mod schedules;

pub use account::AccountApi;
pub use client::ApiClient;

use std::borrow::Cow;

use serde::de::DeserializeOwned;

use openautomate_types::ListResponse;

use crate::error::ApiError;

/// Client scoped to one tenant.
#[derive(Debug, Clone)]
pub struct TenantApi {
    client: ApiClient,
    tenant: String,
}

impl TenantApi {
    pub fn new(client: ApiClient, tenant: impl Into<String>) -> Self {
        Self {
            client,
            tenant: tenant.into(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `{tenant}/api/{rest}`
    pub fn path(&self, rest: &str) -> String {
        format!(
            "{}/api/{}",
            urlencoding::encode(&self.tenant),
            rest.trim_start_matches('/')
        )
    }

    /// Cache key prefix for this tenant's queries.
    pub fn cache_key(&self, rest: &str) -> String {
        format!("{}:{}", self.tenant, rest.trim_start_matches('/'))
    }

    async fn list<T: DeserializeOwned>(
        &self,
        rest: &str,
        query: &ListQuery,
    ) -> Result<Vec<T>, ApiError> {
        let path = format!("{}{}", self.path(rest), query.to_query_string());
        let response: ListResponse<T> = self.client.get(&path).await?;
        Ok(response.into_items())
    }
}

/// Percent-encoded path segment for a caller-supplied id.
///
/// Dot segments are refused: URL parsing resolves them even when encoded.
pub(crate) fn segment(raw: &str) -> Result<Cow<'_, str>, ApiError> {
    if matches!(raw, "" | "." | "..") {
        return Err(ApiError::new(400, format!("Invalid identifier '{}'", raw)));
    }
    Ok(urlencoding::encode(raw))
}

/// OData-style list options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Page `page` (0-based) of `size` items.
    pub fn page(mut self, page: u32, size: u32) -> Self {
        self.top = Some(size);
        self.skip = Some(page.saturating_mul(size));
        self
    }

    /// `?$filter=...&$orderby=...`, empty when nothing is set.
    pub fn to_query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(filter) = &self.filter {
            query.append_pair("$filter", filter);
        }
        if let Some(order_by) = &self.order_by {
            query.append_pair("$orderby", order_by);
        }
        if let Some(top) = self.top {
            query.append_pair("$top", &top.to_string());
        }
        if let Some(skip) = self.skip {
            query.append_pair("$skip", &skip.to_string());
        }
        if self.top.is_some() {
            query.append_pair("$count", "true");
        }
        let query = query.finish();
        if query.is_empty() {
            query
        } else {
            format!("?{}", query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Anonymous;
    use std::sync::Arc;
    use url::Url;

    #[test]
    fn test_tenant_paths() {
        let client = ApiClient::new(
            Url::parse("https://api.openautomate.test").unwrap(),
            Arc::new(Anonymous),
        );
        let api = TenantApi::new(client, "acme");
        assert_eq!(api.path("/agents"), "acme/api/agents");
        assert_eq!(api.cache_key("agents"), "acme:agents");
    }

    #[test]
    fn test_ids_cannot_escape_their_segment() {
        assert_eq!(segment("a1").unwrap(), "a1");
        assert_eq!(segment("../../x").unwrap(), "..%2F..%2Fx");
        assert_eq!(segment("id with space").unwrap(), "id%20with%20space");
        assert_eq!(segment("..").unwrap_err().status, 400);
        assert!(segment("").is_err());

        let client = ApiClient::new(
            Url::parse("https://api.openautomate.test").unwrap(),
            Arc::new(Anonymous),
        );
        let api = TenantApi::new(client.clone(), "acme");
        let path = api.path(&format!("agents/{}", segment("../../admin").unwrap()));
        assert_eq!(
            client.url(&path).unwrap().path(),
            "/acme/api/agents/..%2F..%2Fadmin"
        );
    }

    #[tokio::test]
    async fn test_dot_id_is_rejected_before_sending() {
        let client = ApiClient::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            Arc::new(Anonymous),
        );
        let err = TenantApi::new(client, "acme").get_agent("..").await.unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_list_query_string() {
        assert_eq!(ListQuery::new().to_query_string(), "");
        assert_eq!(
            ListQuery::new()
                .filter("status eq 'Running'")
                .page(2, 25)
                .to_query_string(),
            "?%24filter=status+eq+%27Running%27&%24top=25&%24skip=50&%24count=true"
        );
    }
}
