//! Assets (key/value configuration and secrets handed to agents).

use openautomate_types::{Asset, AssignAssetAgentsRequest, BotAgent, UpsertAssetRequest};

use super::{segment, ListQuery, TenantApi};
use crate::error::ApiError;

impl TenantApi {
    pub async fn list_assets(&self, query: &ListQuery) -> Result<Vec<Asset>, ApiError> {
        self.list("assets", query).await
    }

    pub async fn get_asset(&self, id: &str) -> Result<Asset, ApiError> {
        self.client.get(&self.path(&format!("assets/{}", segment(id)?))).await
    }

    pub async fn create_asset(&self, request: &UpsertAssetRequest) -> Result<Asset, ApiError> {
        self.client.post(&self.path("assets"), request).await
    }

    pub async fn update_asset(&self, id: &str, request: &UpsertAssetRequest) -> Result<Asset, ApiError> {
        self.client.put(&self.path(&format!("assets/{}", segment(id)?)), request).await
    }

    pub async fn delete_asset(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.path(&format!("assets/{}", segment(id)?))).await
    }

    /// Replace the set of agents allowed to read the asset.
    pub async fn assign_asset_agents(&self, id: &str, bot_agent_ids: &[String]) -> Result<(), ApiError> {
        let request = AssignAssetAgentsRequest {
            bot_agent_ids: bot_agent_ids.to_vec(),
        };
        self.client
            .put::<_, serde::de::IgnoredAny>(&self.path(&format!("assets/{}/bot-agents", segment(id)?)), &request)
            .await?;
        Ok(())
    }

    pub async fn asset_agents(&self, id: &str) -> Result<Vec<BotAgent>, ApiError> {
        self.client.get(&self.path(&format!("assets/{}/bot-agents", segment(id)?))).await
    }
}
