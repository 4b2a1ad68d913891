//! Job and milestone models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::ProcessingRequest;

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline checkpoint markers, recorded after each stage completes
/// (or is skipped). Ids are strictly increasing within a run; a crash
/// leaves the last recorded id as the durable high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Acquisition = 1,
    MotionAnalysis = 2,
    Compression = 3,
    Trimming = 4,
    Addons = 5,
    Upload = 6,
    Persistence = 7,
    Cleanup = 8,
}

impl Milestone {
    /// All milestones in recording order.
    pub const ALL: [Milestone; 8] = [
        Milestone::Acquisition,
        Milestone::MotionAnalysis,
        Milestone::Compression,
        Milestone::Trimming,
        Milestone::Addons,
        Milestone::Upload,
        Milestone::Persistence,
        Milestone::Cleanup,
    ];

    /// Integer checkpoint id persisted by the status collaborator.
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Checkpoint name persisted alongside the id.
    pub fn name(&self) -> &'static str {
        match self {
            Milestone::Acquisition => "acquisition",
            Milestone::MotionAnalysis => "motion_analysis",
            Milestone::Compression => "compression",
            Milestone::Trimming => "trimming",
            Milestone::Addons => "addons",
            Milestone::Upload => "upload",
            Milestone::Persistence => "persistence",
            Milestone::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02} {}", self.id(), self.name())
    }
}

/// One processing run: an immutable request plus run-scoped identity.
/// Owned exclusively by the orchestrator for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Database primary key of the work-status row milestones attach to.
    pub status_pk: i64,
    pub request: ProcessingRequest,
    pub received_at: DateTime<Utc>,
}

impl Job {
    pub fn new(status_pk: i64, request: ProcessingRequest) -> Self {
        Self {
            id: JobId::new(),
            status_pk,
            request,
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestone_ids_strictly_increase() {
        let ids: Vec<i16> = Milestone::ALL.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_milestone_display() {
        assert_eq!(Milestone::MotionAnalysis.to_string(), "02 motion_analysis");
        assert_eq!(Milestone::Cleanup.to_string(), "08 cleanup");
    }
}
