//! Tenant administration: users, roles, the organization unit itself,
//! invitations and the subscription.

use openautomate_types::{
    Invitation, InviteUserRequest, OrganizationUnit, OrganizationUnitUser, Role, Subscription,
    UpdateOrganizationUnitRequest, UpdateUserRolesRequest, UpsertRoleRequest,
};

use super::{segment, ListQuery, TenantApi};
use crate::error::ApiError;

impl TenantApi {
    // Users

    pub async fn list_users(&self, query: &ListQuery) -> Result<Vec<OrganizationUnitUser>, ApiError> {
        self.list("ou/users", query).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<OrganizationUnitUser, ApiError> {
        self.client.get(&self.path(&format!("ou/users/{}", segment(user_id)?))).await
    }

    pub async fn update_user_roles(&self, user_id: &str, role_ids: &[String]) -> Result<(), ApiError> {
        let request = UpdateUserRolesRequest {
            role_ids: role_ids.to_vec(),
        };
        self.client
            .put::<_, serde::de::IgnoredAny>(&self.path(&format!("ou/users/{}/roles", segment(user_id)?)), &request)
            .await?;
        Ok(())
    }

    // Roles

    pub async fn list_roles(&self) -> Result<Vec<Role>, ApiError> {
        self.client.get(&self.path("author/roles")).await
    }

    pub async fn create_role(&self, request: &UpsertRoleRequest) -> Result<Role, ApiError> {
        self.client.post(&self.path("author/roles"), request).await
    }

    pub async fn update_role(&self, id: &str, request: &UpsertRoleRequest) -> Result<Role, ApiError> {
        self.client.put(&self.path(&format!("author/roles/{}", segment(id)?)), request).await
    }

    pub async fn delete_role(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.path(&format!("author/roles/{}", segment(id)?))).await
    }

    // Organization unit

    pub async fn organization_unit(&self) -> Result<OrganizationUnit, ApiError> {
        self.client.get(&self.path("ou")).await
    }

    /// Renaming may change the slug; callers must re-route to the new one.
    pub async fn update_organization_unit(
        &self,
        request: &UpdateOrganizationUnitRequest,
    ) -> Result<OrganizationUnit, ApiError> {
        self.client.put(&self.path("ou"), request).await
    }

    // Invitations

    pub async fn invite_user(&self, email: &str) -> Result<Invitation, ApiError> {
        let request = InviteUserRequest {
            email: email.trim().to_string(),
        };
        self.client.post(&self.path("organization-unit-invitation"), &request).await
    }

    pub async fn list_invitations(&self) -> Result<Vec<Invitation>, ApiError> {
        self.list("organization-unit-invitation/list", &ListQuery::default())
            .await
    }

    // Subscription

    pub async fn subscription(&self) -> Result<Subscription, ApiError> {
        self.client.get(&self.path("subscription/status")).await
    }
}
