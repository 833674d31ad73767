use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::model::{DossierId, StepId, UserId};

/// Estado de un paso dentro de un dossier.
///
/// Transiciones del motor:
/// - `Pending` -> `InProgress` (activación como sucesor)
/// - `InProgress` -> `Completed` (`complete_step`)
/// - `Completed` -> `InProgress` (sólo `reopen_step`, pasos `can_loop_back`)
///
/// `Blocked` y `Skipped` sólo se alcanzan por override administrativo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Blocked => "blocked",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StepStatus::Pending),
            "in_progress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            "blocked" => Ok(StepStatus::Blocked),
            "skipped" => Ok(StepStatus::Skipped),
            other => Err(format!("unknown progress status '{other}'")),
        }
    }
}

/// Fila `dossier_workflow_progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRow {
    pub id: Uuid,
    pub dossier_id: DossierId,
    pub workflow_step_id: StepId,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<UserId>,
    pub decision_taken: Option<bool>,
    pub notes: Option<String>,
    pub form_data: Option<Value>,
}

impl ProgressRow {
    pub fn new(dossier_id: DossierId, workflow_step_id: StepId) -> Self {
        Self { id: Uuid::new_v4(),
               dossier_id,
               workflow_step_id,
               status: StepStatus::Pending,
               started_at: None,
               completed_at: None,
               completed_by: None,
               decision_taken: None,
               notes: None,
               form_data: None }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Momento de anclaje en la línea de tiempo: fin si completado, si no
    /// inicio si arrancó.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        match self.status {
            StepStatus::Completed => self.completed_at.or(self.started_at),
            _ => self.started_at,
        }
    }

    pub fn apply(&mut self, patch: &ProgressPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(v) = patch.started_at {
            self.started_at = v;
        }
        if let Some(v) = patch.completed_at {
            self.completed_at = v;
        }
        if let Some(v) = patch.completed_by {
            self.completed_by = v;
        }
        if let Some(v) = patch.decision_taken {
            self.decision_taken = v;
        }
        if let Some(v) = &patch.notes {
            self.notes = v.clone();
        }
        if let Some(v) = &patch.form_data {
            self.form_data = v.clone();
        }
    }
}

/// Parche atómico sobre una fila. `None` = no tocar; `Some(None)` = limpiar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressPatch {
    pub status: Option<StepStatus>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub completed_by: Option<Option<UserId>>,
    pub decision_taken: Option<Option<bool>>,
    pub notes: Option<Option<String>>,
    pub form_data: Option<Option<Value>>,
}

impl ProgressPatch {
    pub fn status(status: StepStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    /// Primera activación de un paso.
    pub fn activate(now: DateTime<Utc>) -> Self {
        Self { status: Some(StepStatus::InProgress),
               started_at: Some(Some(now)),
               ..Default::default() }
    }

    pub fn complete(now: DateTime<Utc>,
                    by: UserId,
                    decision: Option<bool>,
                    notes: Option<String>,
                    form_data: Option<Value>)
                    -> Self {
        Self { status: Some(StepStatus::Completed),
               started_at: None,
               completed_at: Some(Some(now)),
               completed_by: Some(Some(by)),
               decision_taken: Some(decision),
               notes: Some(notes),
               form_data: Some(form_data) }
    }

    /// Reapertura: vuelve a `in_progress` y limpia los campos de cierre.
    pub fn reopen(now: DateTime<Utc>) -> Self {
        Self { status: Some(StepStatus::InProgress),
               started_at: Some(Some(now)),
               completed_at: Some(None),
               completed_by: Some(None),
               decision_taken: Some(None),
               ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_round_trips_through_text_column() {
        for s in [StepStatus::Pending, StepStatus::InProgress, StepStatus::Completed, StepStatus::Blocked, StepStatus::Skipped] {
            assert_eq!(s.as_str().parse::<StepStatus>().unwrap(), s);
        }
        assert!("done".parse::<StepStatus>().is_err());
        assert_eq!(serde_json::to_value(StepStatus::InProgress).unwrap(), json!("in_progress"));
    }

    #[test]
    fn complete_then_reopen_keeps_invariants() {
        let mut row = ProgressRow::new(Uuid::new_v4(), Uuid::new_v4());
        let t0 = Utc::now();
        row.apply(&ProgressPatch::activate(t0));
        let user = Uuid::new_v4();
        row.apply(&ProgressPatch::complete(t0, user, Some(true), Some("ok".into()), Some(json!({"a": 1}))));
        assert!(row.is_completed());
        assert_eq!(row.completed_by, Some(user));
        assert_eq!(row.started_at, Some(t0));
        assert_eq!(row.decision_taken, Some(true));

        row.apply(&ProgressPatch::reopen(t0));
        assert_eq!(row.status, StepStatus::InProgress);
        assert!(row.completed_at.is_none() && row.completed_by.is_none() && row.decision_taken.is_none());
        // Notas y formulario previos se conservan como contexto.
        assert_eq!(row.notes.as_deref(), Some("ok"));
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let row = ProgressRow::new(Uuid::nil(), Uuid::nil());
        let v = serde_json::to_value(&row).unwrap();
        assert!(v.get("workflowStepId").is_some());
        assert_eq!(v["status"], json!("pending"));
    }
}
