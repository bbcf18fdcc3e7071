//! Permission-gated navigation.
//!
//! The sidebar is static data. `filter_navigation` removes every item whose
//! requirement is unmet, then every group left with no visible children and
//! no URL of its own.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use openautomate_types::{PermissionLevel, Resource, UserProfile};

use crate::permissions::PermissionChecker;

/// `RESOURCE:LEVEL`, e.g. `EXECUTION:VIEW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavRequirement {
    pub resource: Resource,
    pub level: PermissionLevel,
}

impl NavRequirement {
    pub fn new(resource: Resource, level: PermissionLevel) -> Self {
        Self { resource, level }
    }
}

impl fmt::Display for NavRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.short_name(), self.level)
    }
}

impl FromStr for NavRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, level) = s
            .split_once(':')
            .ok_or_else(|| format!("expected RESOURCE:LEVEL, got '{}'", s))?;
        Ok(Self {
            resource: resource.parse()?,
            level: level.parse()?,
        })
    }
}

impl Serialize for NavRequirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<NavRequirement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}

impl NavItem {
    pub fn link(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            icon: None,
            permission: None,
            children: Vec::new(),
        }
    }

    /// Container without its own page.
    pub fn group(title: impl Into<String>, children: Vec<NavItem>) -> Self {
        Self {
            title: title.into(),
            url: None,
            icon: None,
            permission: None,
            children,
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn requires(mut self, resource: Resource, level: PermissionLevel) -> Self {
        self.permission = Some(NavRequirement::new(resource, level));
        self
    }

    /// Depth-first walk over this item and its descendants.
    pub fn walk(&self) -> Vec<&NavItem> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// Full sidebar for a tenant, before filtering.
pub fn default_navigation(tenant: &str) -> Vec<NavItem> {
    use PermissionLevel::View;

    let url = |path: &str| format!("/{}/{}", tenant, path);
    vec![
        NavItem::link("Home", url("dashboard")).icon("home"),
        NavItem::group(
            "Automation",
            vec![
                NavItem::link("Executions", url("automation/executions"))
                    .requires(Resource::Execution, View),
                NavItem::link("Schedules", url("automation/schedule"))
                    .requires(Resource::Schedule, View),
                NavItem::link("Packages", url("automation/package"))
                    .requires(Resource::Package, View),
            ],
        )
        .icon("workflow"),
        NavItem::link("Agents", url("agent"))
            .icon("bot")
            .requires(Resource::Agent, View),
        NavItem::link("Assets", url("asset"))
            .icon("key")
            .requires(Resource::Asset, View),
        NavItem::group(
            "Administration",
            vec![
                NavItem::link("Users", url("administration/users"))
                    .requires(Resource::User, View),
                NavItem::link("Roles", url("administration/roles"))
                    .requires(Resource::Admin, View),
                NavItem::link("Organization Unit", url("administration/organization-unit"))
                    .requires(Resource::OrganizationUnit, View),
                NavItem::link("Subscription", url("administration/subscription"))
                    .requires(Resource::Subscription, View),
            ],
        )
        .icon("settings"),
        NavItem::link("Profile", url("profile")).icon("user"),
    ]
}

/// Keep only what `allowed` grants.
pub fn filter_navigation<F>(items: &[NavItem], allowed: F) -> Vec<NavItem>
where
    F: Fn(Resource, PermissionLevel) -> bool,
{
    filter_items(items, &allowed)
}

fn filter_items<F>(items: &[NavItem], allowed: &F) -> Vec<NavItem>
where
    F: Fn(Resource, PermissionLevel) -> bool,
{
    items
        .iter()
        .filter(|item| {
            item.permission
                .map_or(true, |req| allowed(req.resource, req.level))
        })
        .filter_map(|item| {
            let children = filter_items(&item.children, allowed);
            if children.is_empty() && item.url.is_none() {
                return None;
            }
            Some(NavItem {
                children,
                ..item.clone()
            })
        })
        .collect()
}

/// Sidebar the user actually sees in `tenant`.
pub fn navigation_for(profile: &UserProfile, tenant: &str) -> Vec<NavItem> {
    let checker = PermissionChecker::new(profile, tenant);
    filter_navigation(&default_navigation(tenant), |resource, level| {
        checker.can(resource, level)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(items: &[NavItem]) -> Vec<&str> {
        items
            .iter()
            .flat_map(NavItem::walk)
            .map(|i| i.title.as_str())
            .collect()
    }

    #[test]
    fn test_unmet_requirement_is_removed() {
        let items = default_navigation("acme");
        let filtered = filter_navigation(&items, |resource, _| resource != Resource::Execution);
        let names = titles(&filtered);
        assert!(!names.contains(&"Executions"));
        assert!(names.contains(&"Schedules"));
    }

    #[test]
    fn test_empty_group_without_url_is_pruned() {
        let items = default_navigation("acme");
        let filtered = filter_navigation(&items, |_, _| false);
        assert_eq!(titles(&filtered), vec!["Home", "Profile"]);
    }

    #[test]
    fn test_group_with_own_url_survives_without_children() {
        let items = vec![NavItem {
            children: vec![NavItem::link("Roles", "/acme/roles").requires(Resource::Admin, PermissionLevel::View)],
            ..NavItem::link("Administration", "/acme/administration")
        }];
        let filtered = filter_navigation(&items, |_, _| false);
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].children.is_empty());
    }

    #[test]
    fn test_level_is_passed_through() {
        let items = vec![
            NavItem::link("Edit", "/acme/edit").requires(Resource::Asset, PermissionLevel::Update),
            NavItem::link("View", "/acme/view").requires(Resource::Asset, PermissionLevel::View),
        ];
        let filtered = filter_navigation(&items, |_, level| level <= PermissionLevel::View);
        assert_eq!(titles(&filtered), vec!["View"]);
    }

    #[test]
    fn test_urls_are_tenant_scoped() {
        for item in default_navigation("globex").iter().flat_map(NavItem::walk) {
            if let Some(url) = &item.url {
                assert!(url.starts_with("/globex/"), "{}", url);
            }
        }
    }

    #[test]
    fn test_requirement_parse_and_display() {
        let req: NavRequirement = "EXECUTION:VIEW".parse().unwrap();
        assert_eq!(req, NavRequirement::new(Resource::Execution, PermissionLevel::View));
        assert_eq!(req.to_string(), "EXECUTION:VIEW");
        assert!("EXECUTION".parse::<NavRequirement>().is_err());
    }
}
