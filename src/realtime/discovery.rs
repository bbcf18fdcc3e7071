//! Backend discovery.
//!
//! The front end origin knows where the backend lives; the client asks it
//! at runtime instead of baking the backend URL into the build.

use std::time::Duration;

use url::Url;

use openautomate_types::ConnectionInfo;

use crate::error::HubError;

pub const CONNECTION_INFO_PATH: &str = "/api/connection-info";

/// `GET {frontend}/api/connection-info` → backend base URL.
pub async fn discover_api_url(
    http: &reqwest::Client,
    frontend_url: &Url,
    timeout: Duration,
) -> Result<Url, HubError> {
    let url = frontend_url
        .join(CONNECTION_INFO_PATH)
        .map_err(|e| HubError::Discovery(format!("invalid frontend URL: {}", e)))?;

    let response = http
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| HubError::Discovery(format!("{}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(HubError::Discovery(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let info: ConnectionInfo = response
        .json()
        .await
        .map_err(|e| HubError::Discovery(format!("unreadable connection info: {}", e)))?;

    let api_url = Url::parse(info.api_url.trim())
        .map_err(|e| HubError::Discovery(format!("invalid apiUrl '{}': {}", info.api_url, e)))?;

    tracing::debug!(api_url = %api_url, "discovered backend");
    Ok(api_url)
}
