//! Account Types
//!
//! Authentication payloads, the current user, and the permission profile
//! the client uses for navigation gating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permissions::ResourcePermission;

// ============================================================================
// AUTH
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeTokenRequest {
    pub token: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Login / refresh response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub system_role: SystemRole,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expiration: Option<DateTime<Utc>>,
}

impl AuthResponse {
    pub fn user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            system_role: self.system_role,
        }
    }
}

/// Platform-wide role, independent of any organization unit.
///
/// The backend serializes this either as its enum ordinal or its name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum SystemRole {
    #[default]
    User,
    Admin,
}

impl<'de> Deserialize<'de> for SystemRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;

        struct SystemRoleVisitor;

        impl<'de> de::Visitor<'de> for SystemRoleVisitor {
            type Value = SystemRole;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a system role name or ordinal")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                match v {
                    0 => Ok(SystemRole::User),
                    1 => Ok(SystemRole::Admin),
                    other => Err(E::custom(format!("unknown system role {}", other))),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v < 0 {
                    return Err(E::custom(format!("unknown system role {}", v)));
                }
                self.visit_u64(v as u64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.eq_ignore_ascii_case("admin") {
                    Ok(SystemRole::Admin)
                } else if v.eq_ignore_ascii_case("user") {
                    Ok(SystemRole::User)
                } else {
                    Err(E::custom(format!("unknown system role '{}'", v)))
                }
            }
        }

        deserializer.deserialize_any(SystemRoleVisitor)
    }
}

/// Authenticated user as persisted in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub system_role: SystemRole,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

// ============================================================================
// PROFILE
// ============================================================================

/// Profile snapshot with per-tenant permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub system_role: SystemRole,
    #[serde(default)]
    pub organization_units: Vec<OrganizationUnitPermissions>,
}

impl UserProfile {
    /// Permission entry for a tenant slug.
    pub fn tenant(&self, slug: &str) -> Option<&OrganizationUnitPermissions> {
        self.organization_units
            .iter()
            .find(|ou| ou.slug.eq_ignore_ascii_case(slug))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUnitPermissions {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub permissions: Vec<ResourcePermission>,
}

// ============================================================================
// ORGANIZATION UNITS (tenants)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUnit {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyOrganizationUnitsResponse {
    pub organization_units: Vec<OrganizationUnit>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationUnitRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationUnitRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
