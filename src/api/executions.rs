//! Executions.

use openautomate_types::{Execution, TriggerExecutionRequest};

use super::{segment, ListQuery, TenantApi};
use crate::error::ApiError;

impl TenantApi {
    pub async fn list_executions(&self, query: &ListQuery) -> Result<Vec<Execution>, ApiError> {
        self.list("executions", query).await
    }

    pub async fn get_execution(&self, id: &str) -> Result<Execution, ApiError> {
        self.client.get(&self.path(&format!("executions/{}", segment(id)?))).await
    }

    pub async fn trigger_execution(
        &self,
        request: &TriggerExecutionRequest,
    ) -> Result<Execution, ApiError> {
        self.client.post(&self.path("executions/trigger"), request).await
    }

    pub async fn cancel_execution(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .post_unit(&self.path(&format!("executions/{}/cancel", segment(id)?)), &serde_json::json!({}))
            .await
    }
}
