//! Automation Types
//!
//! Bot agents, packages, executions, schedules and assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// BOT AGENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotAgent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub machine_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_connected: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBotAgentRequest {
    pub name: String,
    pub machine_name: String,
}

/// Creation response. The machine key is only ever returned here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBotAgentResponse {
    #[serde(flatten)]
    pub agent: BotAgent,
    #[serde(default)]
    pub machine_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBotAgentRequest {
    pub name: String,
    pub machine_name: String,
}

// ============================================================================
// PACKAGES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationPackage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub versions: Vec<PackageVersion>,
}

impl AutomationPackage {
    /// Most recently uploaded active version.
    pub fn latest_version(&self) -> Option<&PackageVersion> {
        self.versions
            .iter()
            .filter(|v| v.is_active)
            .max_by_key(|v| v.uploaded_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersion {
    pub id: String,
    pub version_number: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

// ============================================================================
// EXECUTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub bot_agent_id: Option<String>,
    #[serde(default)]
    pub bot_agent_name: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub has_logs: bool,
}

impl Execution {
    pub fn is_finished(&self) -> bool {
        is_terminal_execution_status(&self.status)
    }
}

/// Execution statuses after which no further transitions happen.
pub fn is_terminal_execution_status(status: &str) -> bool {
    ["Completed", "Failed", "Cancelled"]
        .iter()
        .any(|s| s.eq_ignore_ascii_case(status))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerExecutionRequest {
    pub bot_agent_id: String,
    pub package_id: String,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

// ============================================================================
// SCHEDULES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceType {
    Once,
    Minutes,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_enabled: bool,
    pub recurrence_type: RecurrenceType,
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub one_time_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_zone_id: Option<String>,
    pub automation_package_id: String,
    #[serde(default)]
    pub automation_package_name: Option<String>,
    pub bot_agent_id: String,
    #[serde(default)]
    pub bot_agent_name: Option<String>,
    #[serde(default)]
    pub next_run_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertScheduleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_enabled: bool,
    pub recurrence_type: RecurrenceType,
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub one_time_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_zone_id: Option<String>,
    pub automation_package_id: String,
    pub bot_agent_id: String,
}

// ============================================================================
// ASSETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AssetType {
    String,
    Secret,
}

impl TryFrom<u8> for AssetType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::String),
            1 => Ok(Self::Secret),
            other => Err(format!("invalid asset type {}", other)),
        }
    }
}

impl From<AssetType> for u8 {
    fn from(value: AssetType) -> Self {
        match value {
            AssetType::String => 0,
            AssetType::Secret => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    /// Absent for secrets in list responses.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAssetRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    #[serde(default)]
    pub bot_agent_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAssetAgentsRequest {
    pub bot_agent_ids: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(is_terminal_execution_status("completed"));
        assert!(is_terminal_execution_status("Failed"));
        assert!(!is_terminal_execution_status("Running"));
        assert!(!is_terminal_execution_status("Pending"));
    }

    #[test]
    fn test_latest_version_ignores_inactive() {
        let package: AutomationPackage = serde_json::from_str(
            r#"{
                "id": "p1",
                "name": "Invoices",
                "versions": [
                    {"id": "v1", "versionNumber": "1.0.0", "uploadedAt": "2024-01-01T00:00:00Z"},
                    {"id": "v2", "versionNumber": "1.1.0", "uploadedAt": "2024-02-01T00:00:00Z", "isActive": false},
                    {"id": "v3", "versionNumber": "1.0.1", "uploadedAt": "2024-01-15T00:00:00Z"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(package.latest_version().unwrap().version_number, "1.0.1");
    }

    #[test]
    fn test_asset_type_wire_format() {
        let asset: Asset = serde_json::from_str(
            r#"{"id": "a1", "key": "smtp-password", "type": 1}"#,
        )
        .unwrap();
        assert_eq!(asset.asset_type, AssetType::Secret);
        assert!(asset.value.is_none());
    }
}
