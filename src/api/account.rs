//! Account endpoints (not tenant scoped).

use openautomate_types::{
    AuthResponse, CreateOrganizationUnitRequest, LoginRequest, MyOrganizationUnitsResponse,
    OrganizationUnit, RefreshTokenRequest, RevokeTokenRequest, UserProfile,
};

use super::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AccountApi {
    client: ApiClient,
}

impl AccountApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.client.post("api/authen/login", request).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ApiError> {
        let request = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.client.post("api/authen/refresh-token", &request).await
    }

    pub async fn revoke(&self, token: &str) -> Result<(), ApiError> {
        let request = RevokeTokenRequest {
            token: token.to_string(),
            reason: Some("User logout".to_string()),
        };
        self.client.post_unit("api/authen/revoke-token", &request).await
    }

    /// Current user with per-tenant permissions.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.client.get("api/account/profile").await
    }

    pub async fn my_organization_units(&self) -> Result<Vec<OrganizationUnit>, ApiError> {
        let response: MyOrganizationUnitsResponse = self.client.get("api/ou/my-ous").await?;
        Ok(response.organization_units)
    }

    pub async fn create_organization_unit(
        &self,
        request: &CreateOrganizationUnitRequest,
    ) -> Result<OrganizationUnit, ApiError> {
        self.client.post("api/ou/create", request).await
    }
}
