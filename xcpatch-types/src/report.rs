use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::HookContext;

/// Result of a full patch run, written to `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchReport {
    pub schema: String,

    pub tool: ToolInfo,

    #[serde(default)]
    pub run: RunInfo,

    pub context: HookContext,

    /// False when the run was a preview (nothing written to disk).
    pub applied: bool,

    #[serde(default)]
    pub steps: Vec<StepOutcome>,

    pub summary: PatchSummary,
}

impl PatchReport {
    pub fn new(tool: ToolInfo, context: HookContext) -> Self {
        Self {
            schema: crate::schema::XCPATCH_REPORT_V1.to_string(),
            tool,
            run: RunInfo {
                started_at: Some(Utc::now()),
                ended_at: None,
            },
            context,
            applied: false,
            steps: vec![],
            summary: PatchSummary::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Outcome of one patch step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_id: String,

    pub title: String,

    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_changed: Vec<FileChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Applied,
    Skipped,
    Failed,
}

/// One file modified by a step, with integrity digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,

    pub before_sha256: String,

    pub after_sha256: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchSummary {
    pub steps_total: u64,
    pub applied: u64,
    pub skipped: u64,
    pub failed: u64,
    pub files_modified: u64,
}
