use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::AuditEntry;
use crate::model::{DossierId, StepId};
use crate::progress::{ProgressRow, StepStatus};

/// Petición de completar un paso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteStep {
    pub dossier_id: DossierId,
    pub step_id: StepId,
    #[serde(default)]
    pub decision: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub form_data: Option<Value>,
}

impl CompleteStep {
    pub fn new(dossier_id: DossierId, step_id: StepId) -> Self {
        Self { dossier_id,
               step_id,
               decision: None,
               notes: None,
               form_data: None }
    }

    pub fn with_decision(mut self, decision: bool) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_form_data(mut self, form_data: Value) -> Self {
        self.form_data = Some(form_data);
        self
    }
}

/// Reapertura explícita de un paso `can_loop_back`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenStep {
    pub dossier_id: DossierId,
    pub step_id: StepId,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Transiciones administrativas fuera del flujo normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOverride {
    Block,
    Skip,
    Unblock,
}

impl StatusOverride {
    /// Estados desde los que se permite el override.
    pub fn allowed_from(&self) -> &'static [StepStatus] {
        match self {
            StatusOverride::Block => &[StepStatus::Pending, StepStatus::InProgress],
            StatusOverride::Skip => &[StepStatus::Pending, StepStatus::InProgress, StepStatus::Blocked],
            StatusOverride::Unblock => &[StepStatus::Blocked],
        }
    }
}

/// Resultado de una transición confirmada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    /// Fila del paso afectado tras la transición.
    pub step: ProgressRow,
    /// Pasos que pasaron de `pending` a `in_progress`.
    pub activated: Vec<StepId>,
    /// Todas las filas del dossier tras la transición.
    pub progress: Vec<ProgressRow>,
    pub audit: AuditEntry,
}
