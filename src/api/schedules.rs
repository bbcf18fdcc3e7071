//! Schedules.

use openautomate_types::{Schedule, UpsertScheduleRequest};

use super::{segment, ListQuery, TenantApi};
use crate::error::ApiError;

impl TenantApi {
    pub async fn list_schedules(&self, query: &ListQuery) -> Result<Vec<Schedule>, ApiError> {
        self.list("schedules", query).await
    }

    pub async fn get_schedule(&self, id: &str) -> Result<Schedule, ApiError> {
        self.client.get(&self.path(&format!("schedules/{}", segment(id)?))).await
    }

    pub async fn create_schedule(&self, request: &UpsertScheduleRequest) -> Result<Schedule, ApiError> {
        self.client.post(&self.path("schedules"), request).await
    }

    pub async fn update_schedule(
        &self,
        id: &str,
        request: &UpsertScheduleRequest,
    ) -> Result<Schedule, ApiError> {
        self.client.put(&self.path(&format!("schedules/{}", segment(id)?)), request).await
    }

    pub async fn delete_schedule(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.path(&format!("schedules/{}", segment(id)?))).await
    }

    pub async fn enable_schedule(&self, id: &str) -> Result<Schedule, ApiError> {
        self.set_schedule_enabled(id, true).await
    }

    pub async fn disable_schedule(&self, id: &str) -> Result<Schedule, ApiError> {
        self.set_schedule_enabled(id, false).await
    }

    async fn set_schedule_enabled(&self, id: &str, enabled: bool) -> Result<Schedule, ApiError> {
        let action = if enabled { "enable" } else { "disable" };
        self.client
            .post(&self.path(&format!("schedules/{}/{}", segment(id)?, action)), &serde_json::json!({}))
            .await
    }
}
