//! Live status overlay on REST snapshots.
//!
//! The REST list is the baseline; whatever the hub has reported since wins.
//! Overlays only ever write status-store values onto snapshots.

use openautomate_types::{BotAgent, Execution};

use super::store::StatusMap;

/// Returns how many agents changed.
pub fn apply_agent_statuses(agents: &mut [BotAgent], live: &StatusMap) -> usize {
    let mut changed = 0;
    for agent in agents.iter_mut() {
        let Some(update) = live.get(&agent.id) else {
            continue;
        };
        if agent.status != update.status {
            agent.status = update.status.clone();
            changed += 1;
        }
        agent.last_connected = Some(
            agent
                .last_connected
                .map_or(update.timestamp, |seen| seen.max(update.timestamp)),
        );
    }
    changed
}

/// Returns how many executions changed. Error messages from the hub
/// replace the snapshot's only for failed executions.
pub fn apply_execution_statuses(executions: &mut [Execution], live: &StatusMap) -> usize {
    let mut changed = 0;
    for execution in executions.iter_mut() {
        let Some(update) = live.get(&execution.id) else {
            continue;
        };
        if execution.status == update.status {
            continue;
        }
        execution.status = update.status.clone();
        if execution.is_finished() && execution.end_time.is_none() {
            execution.end_time = Some(update.timestamp);
        }
        if update.status.eq_ignore_ascii_case("Failed") {
            if let Some(message) = &update.message {
                execution.error_message = Some(message.clone());
            }
        }
        changed += 1;
    }
    changed
}
