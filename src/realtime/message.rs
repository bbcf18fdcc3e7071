//! Hub payload normalization.
//!
//! Status payloads arrive with camelCase or PascalCase field names (the
//! backend has emitted both over time, sometimes in one message). This is
//! the only place that looks at the raw shape: everything downstream sees a
//! `StatusUpdate`.
//!
//! Field resolution order: camelCase, then PascalCase, then any other casing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use openautomate_types::{StatusChannel, StatusUpdate};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("status payload is not a JSON object")]
    NotAnObject,

    #[error("{channel:?} status payload is missing '{field}'")]
    MissingField {
        channel: StatusChannel,
        field: &'static str,
    },
}

const BOT_AGENT_ID: &[&str] = &["botAgentId", "agentId"];
const AGENT_NAME: &[&str] = &["agentName", "botAgentName"];
const STATUS: &[&str] = &["status"];
const EXECUTION_ID: &[&str] = &["executionId"];
const MESSAGE: &[&str] = &["message"];
const TIMESTAMP: &[&str] = &["timestamp"];

/// Normalize one hub payload into the canonical record.
///
/// `received_at` stands in for a missing or unparseable timestamp.
pub fn normalize_status_update(
    channel: StatusChannel,
    raw: &Value,
    received_at: DateTime<Utc>,
) -> Result<StatusUpdate, NormalizeError> {
    let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let update = StatusUpdate {
        bot_agent_id: text_field(obj, BOT_AGENT_ID),
        agent_name: text_field(obj, AGENT_NAME),
        status: text_field(obj, STATUS).ok_or(NormalizeError::MissingField {
            channel,
            field: "status",
        })?,
        execution_id: text_field(obj, EXECUTION_ID),
        message: text_field(obj, MESSAGE),
        timestamp: text_field(obj, TIMESTAMP)
            .and_then(|ts| parse_timestamp(&ts))
            .unwrap_or(received_at),
    };

    let (required, field) = match channel {
        StatusChannel::Agent => (&update.bot_agent_id, "botAgentId"),
        StatusChannel::Execution => (&update.execution_id, "executionId"),
    };
    if required.is_none() {
        return Err(NormalizeError::MissingField { channel, field });
    }

    Ok(update)
}

/// Resolve a field under any of its names and casings.
fn lookup<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    for name in names {
        if let Some(v) = obj.get(*name).filter(|v| !v.is_null()) {
            return Some(v);
        }
        if let Some(v) = obj.get(&pascal_case(name)).filter(|v| !v.is_null()) {
            return Some(v);
        }
    }
    names.iter().find_map(|name| {
        obj.iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(name) && !v.is_null())
            .map(|(_, v)| v)
    })
}

/// String or number field, trimmed; empty strings count as absent.
fn text_field(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    let text = match lookup(obj, names)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// RFC 3339, or a zone-less ISO timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_pascal_and_camel_normalize_identically() {
        let pascal = json!({
            "BotAgentId": "a1",
            "AgentName": "Runner 1",
            "Status": "Busy",
            "ExecutionId": "e1",
            "Timestamp": "2024-01-01T00:00:00Z"
        });
        let camel = json!({
            "botAgentId": "a1",
            "agentName": "Runner 1",
            "status": "Busy",
            "executionId": "e1",
            "timestamp": "2024-01-01T00:00:00Z"
        });
        let a = normalize_status_update(StatusChannel::Agent, &pascal, received()).unwrap();
        let b = normalize_status_update(StatusChannel::Agent, &camel, received()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_camel_wins_over_pascal_in_mixed_payload() {
        let mixed = json!({
            "botAgentId": "a1",
            "Status": "Busy",
            "status": "Available"
        });
        let update = normalize_status_update(StatusChannel::Agent, &mixed, received()).unwrap();
        assert_eq!(update.status, "Available");
    }

    #[test]
    fn test_other_casings_are_accepted() {
        let shouty = json!({"BOTAGENTID": "a7", "STATUS": "Offline"});
        let update = normalize_status_update(StatusChannel::Agent, &shouty, received()).unwrap();
        assert_eq!(update.bot_agent_id.as_deref(), Some("a7"));
        assert_eq!(update.status, "Offline");
    }

    #[test]
    fn test_missing_timestamp_uses_receive_time() {
        let raw = json!({"botAgentId": "a1", "status": "Busy", "timestamp": "yesterday"});
        let update = normalize_status_update(StatusChannel::Agent, &raw, received()).unwrap();
        assert_eq!(update.timestamp, received());
    }

    #[test]
    fn test_zoneless_timestamp_is_utc() {
        let raw = json!({"botAgentId": "a1", "status": "Busy", "timestamp": "2024-03-05T10:11:12.1234567"});
        let update = normalize_status_update(StatusChannel::Agent, &raw, received()).unwrap();
        assert_eq!(update.timestamp.date_naive().to_string(), "2024-03-05");
    }

    #[test]
    fn test_channel_key_is_required() {
        let raw = json!({"botAgentId": "a1", "status": "Running"});
        assert_eq!(
            normalize_status_update(StatusChannel::Execution, &raw, received()),
            Err(NormalizeError::MissingField {
                channel: StatusChannel::Execution,
                field: "executionId"
            })
        );

        let raw = json!({"botAgentId": "a1"});
        assert!(matches!(
            normalize_status_update(StatusChannel::Agent, &raw, received()),
            Err(NormalizeError::MissingField { field: "status", .. })
        ));

        assert_eq!(
            normalize_status_update(StatusChannel::Agent, &json!(["a1"]), received()),
            Err(NormalizeError::NotAnObject)
        );
    }

    #[test]
    fn test_numeric_ids_and_blank_strings() {
        let raw = json!({"executionId": 42, "status": "Running", "message": "  "});
        let update = normalize_status_update(StatusChannel::Execution, &raw, received()).unwrap();
        assert_eq!(update.execution_id.as_deref(), Some("42"));
        assert_eq!(update.message, None);
    }
}
