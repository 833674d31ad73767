use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{DossierId, StepId, UserId};
use crate::progress::StepStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditKind {
    /// Fija el `definition_hash` de la plantilla contra la que se abrió el
    /// dossier.
    ProgressInitialized { definition_hash: String, step_count: usize },
    StepCompleted { step_name: String },
    DecisionTaken { step_name: String, decision: bool },
    StepReopened { step_name: String, reason: Option<String> },
    StatusOverridden { step_name: String, status: StepStatus },
}

impl AuditKind {
    /// Texto del comentario de auditoría.
    pub fn message(&self) -> String {
        match self {
            AuditKind::ProgressInitialized { step_count, .. } => format!("Workflow started ({step_count} steps)"),
            AuditKind::StepCompleted { step_name } => format!("Step {step_name} completed"),
            AuditKind::DecisionTaken { step_name, decision } => {
                format!("Decision for {step_name}: {}", if *decision { "yes" } else { "no" })
            }
            AuditKind::StepReopened { step_name, reason: Some(r) } => format!("Step {step_name} reopened: {r}"),
            AuditKind::StepReopened { step_name, reason: None } => format!("Step {step_name} reopened"),
            AuditKind::StatusOverridden { step_name, status } => format!("Step {step_name} marked {status}"),
        }
    }

    /// Nombre estable en minúsculas (columna `comment_type` / logs).
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditKind::ProgressInitialized { .. } => "progress_initialized",
            AuditKind::StepCompleted { .. } => "step_completed",
            AuditKind::DecisionTaken { .. } => "decision_taken",
            AuditKind::StepReopened { .. } => "step_reopened",
            AuditKind::StatusOverridden { .. } => "status_overridden",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Orden de inserción dentro del dossier (asignado por el store).
    pub seq: u64,
    pub dossier_id: DossierId,
    pub step_id: Option<StepId>,
    pub author_id: UserId,
    pub kind: AuditKind,
    pub ts: DateTime<Utc>,
}

impl AuditEntry {
    pub fn message(&self) -> String {
        self.kind.message()
    }
}
