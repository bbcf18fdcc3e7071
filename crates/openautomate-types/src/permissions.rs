//! Permission Types
//!
//! Resources and ordered permission levels as the backend's authorization
//! policy models them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered permission level. A grant of level N implies every level below N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PermissionLevel {
    NoAccess = 0,
    View = 1,
    Create = 2,
    Update = 3,
    Delete = 4,
}

impl TryFrom<u8> for PermissionLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NoAccess),
            1 => Ok(Self::View),
            2 => Ok(Self::Create),
            3 => Ok(Self::Update),
            4 => Ok(Self::Delete),
            other => Err(format!("invalid permission level {}", other)),
        }
    }
}

impl From<PermissionLevel> for u8 {
    fn from(level: PermissionLevel) -> Self {
        level as u8
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NO_ACCESS" | "NOACCESS" | "NONE" => Ok(Self::NoAccess),
            "VIEW" | "READ" => Ok(Self::View),
            "CREATE" => Ok(Self::Create),
            "UPDATE" | "EDIT" => Ok(Self::Update),
            "DELETE" | "FULL" => Ok(Self::Delete),
            other => other
                .parse::<u8>()
                .map_err(|_| format!("unknown permission level '{}'", s))
                .and_then(Self::try_from),
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoAccess => "NO_ACCESS",
            Self::View => "VIEW",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Protected resource families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Admin,
    Agent,
    Asset,
    Package,
    Schedule,
    Execution,
    User,
    OrganizationUnit,
    Subscription,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Admin,
        Resource::Agent,
        Resource::Asset,
        Resource::Package,
        Resource::Schedule,
        Resource::Execution,
        Resource::User,
        Resource::OrganizationUnit,
        Resource::Subscription,
    ];

    /// Name used by the backend in permission payloads.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Admin => "AdminResource",
            Self::Agent => "AgentResource",
            Self::Asset => "AssetResource",
            Self::Package => "PackageResource",
            Self::Schedule => "ScheduleResource",
            Self::Execution => "ExecutionResource",
            Self::User => "UserResource",
            Self::OrganizationUnit => "OrganizationUnitResource",
            Self::Subscription => "SubscriptionResource",
        }
    }

    /// Short upper-case form used in navigation requirements (`EXECUTION`).
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Agent => "AGENT",
            Self::Asset => "ASSET",
            Self::Package => "PACKAGE",
            Self::Schedule => "SCHEDULE",
            Self::Execution => "EXECUTION",
            Self::User => "USER",
            Self::OrganizationUnit => "ORGANIZATION_UNIT",
            Self::Subscription => "SUBSCRIPTION",
        }
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .trim_end_matches("Resource")
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_uppercase)
            .collect();
        match normalized.as_str() {
            "ADMIN" => Ok(Self::Admin),
            "AGENT" | "BOTAGENT" => Ok(Self::Agent),
            "ASSET" => Ok(Self::Asset),
            "PACKAGE" => Ok(Self::Package),
            "SCHEDULE" => Ok(Self::Schedule),
            "EXECUTION" => Ok(Self::Execution),
            "USER" => Ok(Self::User),
            "ORGANIZATIONUNIT" => Ok(Self::OrganizationUnit),
            "SUBSCRIPTION" => Ok(Self::Subscription),
            _ => Err(format!("unknown resource '{}'", s)),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// One resource grant inside an organization unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePermission {
    pub resource_name: String,
    pub permission: PermissionLevel,
}

impl ResourcePermission {
    pub fn new(resource: Resource, permission: PermissionLevel) -> Self {
        Self {
            resource_name: resource.wire_name().to_string(),
            permission,
        }
    }

    /// Parsed resource, `None` for resources this client does not know.
    pub fn resource(&self) -> Option<Resource> {
        self.resource_name.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(PermissionLevel::Delete > PermissionLevel::Update);
        assert!(PermissionLevel::View > PermissionLevel::NoAccess);
    }

    #[test]
    fn test_level_wire_format_is_integer() {
        let level: PermissionLevel = serde_json::from_str("3").unwrap();
        assert_eq!(level, PermissionLevel::Update);
        assert_eq!(serde_json::to_string(&PermissionLevel::View).unwrap(), "1");
        assert!(serde_json::from_str::<PermissionLevel>("9").is_err());
    }

    #[test]
    fn test_resource_parses_wire_and_short_names() {
        for resource in Resource::ALL {
            assert_eq!(resource.wire_name().parse::<Resource>(), Ok(resource));
            assert_eq!(resource.short_name().parse::<Resource>(), Ok(resource));
        }
        assert_eq!("execution".parse::<Resource>(), Ok(Resource::Execution));
        assert!("Billing".parse::<Resource>().is_err());
    }
}
