//! Tenants (organization units) and their slugs.
//!
//! Tenant-scoped routes start with the slug: `/{slug}/agent`,
//! `/{slug}/automation/executions`. Top-level application routes share the
//! same first-segment position and are never slugs.

use openautomate_types::OrganizationUnit;

use crate::api::AccountApi;
use crate::auth::SessionStore;
use crate::error::TenantError;

/// First path segments that belong to the application, not a tenant.
pub const RESERVED_SEGMENTS: &[&str] = &[
    "login",
    "register",
    "tenant-selector",
    "api",
    "forgot-password",
    "reset-password",
    "verify-email",
    "email-verified",
    "invitation",
    "system-admin",
    "_next",
];

/// Tenant slug of a route path, `None` for application routes.
pub fn tenant_from_path(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let first = path.trim_start_matches('/').split('/').next()?;
    if first.is_empty() || is_reserved(first) || !is_valid_slug(first) {
        return None;
    }
    Some(first)
}

pub fn is_reserved(segment: &str) -> bool {
    RESERVED_SEGMENTS
        .iter()
        .any(|r| r.eq_ignore_ascii_case(segment))
}

/// Lowercase ASCII letters, digits and inner hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Slug the backend derives from an organization unit name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Lists the user's organization units and remembers the chosen one.
#[derive(Debug, Clone)]
pub struct TenantSelector {
    account: AccountApi,
    session: SessionStore,
}

impl TenantSelector {
    pub fn new(account: AccountApi, session: SessionStore) -> Self {
        Self { account, session }
    }

    /// Active organization units the user belongs to.
    pub async fn list(&self) -> Result<Vec<OrganizationUnit>, TenantError> {
        let units = self.account.my_organization_units().await?;
        Ok(units.into_iter().filter(|ou| ou.is_active).collect())
    }

    pub async fn resolve(&self, slug: &str) -> Result<OrganizationUnit, TenantError> {
        if !is_valid_slug(slug) || is_reserved(slug) {
            return Err(TenantError::InvalidSlug(slug.to_string()));
        }
        self.list()
            .await?
            .into_iter()
            .find(|ou| ou.slug.eq_ignore_ascii_case(slug))
            .ok_or_else(|| TenantError::NotFound(slug.to_string()))
    }

    /// Resolve and persist the selection.
    pub async fn select(&self, slug: &str) -> Result<OrganizationUnit, TenantError> {
        let unit = self.resolve(slug).await?;
        self.session.select_tenant(&unit.slug)?;
        tracing::info!(tenant = %unit.slug, name = %unit.name, "tenant selected");
        Ok(unit)
    }

    /// The remembered tenant, if the user still belongs to it.
    pub async fn current(&self) -> Result<Option<OrganizationUnit>, TenantError> {
        let Some(slug) = self.session.tenant() else {
            return Ok(None);
        };
        match self.resolve(&slug).await {
            Ok(unit) => Ok(Some(unit)),
            Err(TenantError::NotFound(_)) | Err(TenantError::InvalidSlug(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
