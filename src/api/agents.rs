//! Bot agents.

use openautomate_types::{BotAgent, CreateBotAgentRequest, CreateBotAgentResponse, UpdateBotAgentRequest};

use super::{segment, ListQuery, TenantApi};
use crate::error::ApiError;

impl TenantApi {
    pub async fn list_agents(&self, query: &ListQuery) -> Result<Vec<BotAgent>, ApiError> {
        self.list("agents", query).await
    }

    pub async fn get_agent(&self, id: &str) -> Result<BotAgent, ApiError> {
        self.client.get(&self.path(&format!("agents/{}", segment(id)?))).await
    }

    /// The machine key in the response is shown once and never again.
    pub async fn create_agent(
        &self,
        request: &CreateBotAgentRequest,
    ) -> Result<CreateBotAgentResponse, ApiError> {
        self.client.post(&self.path("agents/create"), request).await
    }

    pub async fn update_agent(
        &self,
        id: &str,
        request: &UpdateBotAgentRequest,
    ) -> Result<BotAgent, ApiError> {
        self.client.put(&self.path(&format!("agents/{}", segment(id)?)), request).await
    }

    pub async fn delete_agent(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.path(&format!("agents/{}", segment(id)?))).await
    }
}
