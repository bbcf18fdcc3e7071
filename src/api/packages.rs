//! Automation packages.

use openautomate_types::AutomationPackage;

use super::{segment, ListQuery, TenantApi};
use crate::error::ApiError;

impl TenantApi {
    pub async fn list_packages(&self, query: &ListQuery) -> Result<Vec<AutomationPackage>, ApiError> {
        self.list("packages", query).await
    }

    pub async fn get_package(&self, id: &str) -> Result<AutomationPackage, ApiError> {
        self.client.get(&self.path(&format!("packages/{}", segment(id)?))).await
    }

    /// Deletes the package with all of its versions.
    pub async fn delete_package(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.path(&format!("packages/{}", segment(id)?))).await
    }

    pub async fn delete_package_version(&self, id: &str, version: &str) -> Result<(), ApiError> {
        self.client
            .delete(&self.path(&format!("packages/{}/versions/{}", segment(id)?, segment(version)?)))
            .await
    }
}
