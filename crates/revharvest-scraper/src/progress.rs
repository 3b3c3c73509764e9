//! Progress reporting for harvest runs.
//!
//! Reporters are passed explicitly to the orchestrator and the batch
//! coordinator. They are called synchronously from the harvesting task, so
//! implementations should return quickly.

use revharvest_core::Source;
use serde::Serialize;

/// Where a single (entity, source) harvest currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestPhase {
    Init,
    Fetching,
    Normalizing,
    Done,
    Failed,
}

impl std::fmt::Display for HarvestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HarvestPhase::Init => "init",
            HarvestPhase::Fetching => "fetching",
            HarvestPhase::Normalizing => "normalizing",
            HarvestPhase::Done => "done",
            HarvestPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Emitted by the orchestrator after every batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub company: String,
    pub source: Source,
    pub fetched: usize,
    pub target: usize,
    pub batches: usize,
    pub phase: HarvestPhase,
}

/// Emitted by the batch coordinator at entity and source boundaries.
/// Serialized in camelCase for the `--events` stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub current_entity: String,
    pub current_source: Option<String>,
    pub progress_percent: u8,
    pub step: String,
    pub completed_entities: usize,
    pub total_entities: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Batch(BatchProgress),
    Job(JobProgress),
}

/// Receives progress events during a harvest.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _event: &ProgressEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Batch(p) => tracing::info!(
                company = %p.company,
                source = %p.source,
                fetched = p.fetched,
                target = p.target,
                batches = p.batches,
                phase = %p.phase,
                "harvest progress"
            ),
            ProgressEvent::Job(p) => tracing::info!(
                entity = %p.current_entity,
                source = p.current_source.as_deref().unwrap_or("-"),
                percent = p.progress_percent,
                completed = p.completed_entities,
                total = p.total_entities,
                step = %p.step,
                "job progress"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn job_progress_serializes_camel_case() {
        let progress = JobProgress {
            current_entity: "Acme".to_string(),
            current_source: Some("Trustpilot".to_string()),
            progress_percent: 50,
            step: "harvesting Trustpilot".to_string(),
            completed_entities: 1,
            total_entities: 2,
        };

        let value = serde_json::to_value(&progress).unwrap();

        assert_eq!(
            value,
            json!({
                "currentEntity": "Acme",
                "currentSource": "Trustpilot",
                "progressPercent": 50,
                "step": "harvesting Trustpilot",
                "completedEntities": 1,
                "totalEntities": 2
            })
        );
    }

    #[test]
    fn entity_level_events_have_null_source() {
        let progress = JobProgress {
            current_entity: "Acme".to_string(),
            current_source: None,
            progress_percent: 0,
            step: "starting entity".to_string(),
            completed_entities: 0,
            total_entities: 1,
        };

        let value = serde_json::to_value(&progress).unwrap();
        assert!(value["currentSource"].is_null());
        assert!(value.get("current_source").is_none());
    }
}
