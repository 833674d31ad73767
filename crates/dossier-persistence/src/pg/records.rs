//! Filas Diesel y su conversión a tipos del core.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use dossier_core::{AuditEntry, AuditKind, FormField, ProgressPatch, ProgressRow, StepStatus, StepType, WorkflowStep};

use crate::error::PersistenceError;
use crate::schema::{dossier_comments, dossier_workflow_progress, workflow_steps, workflow_templates};

/// Valor de `comment_type` de los comentarios de auditoría del motor.
pub(crate) const WORKFLOW_COMMENT: &str = "workflow";

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = dossier_workflow_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProgressRecord {
    pub id: Uuid,
    pub dossier_id: Uuid,
    pub workflow_step_id: Uuid,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    pub decision_taken: Option<bool>,
    pub notes: Option<String>,
    pub form_data: Option<Value>,
}

impl From<&ProgressRow> for ProgressRecord {
    fn from(row: &ProgressRow) -> Self {
        Self { id: row.id,
               dossier_id: row.dossier_id,
               workflow_step_id: row.workflow_step_id,
               status: row.status.as_str().to_string(),
               started_at: row.started_at,
               completed_at: row.completed_at,
               completed_by: row.completed_by,
               decision_taken: row.decision_taken,
               notes: row.notes.clone(),
               form_data: row.form_data.clone() }
    }
}

impl TryFrom<ProgressRecord> for ProgressRow {
    type Error = PersistenceError;

    fn try_from(r: ProgressRecord) -> Result<Self, Self::Error> {
        let status: StepStatus = r.status.parse().map_err(PersistenceError::Corrupt)?;
        Ok(ProgressRow { id: r.id,
                         dossier_id: r.dossier_id,
                         workflow_step_id: r.workflow_step_id,
                         status,
                         started_at: r.started_at,
                         completed_at: r.completed_at,
                         completed_by: r.completed_by,
                         decision_taken: r.decision_taken,
                         notes: r.notes,
                         form_data: r.form_data })
    }
}

/// `None` = columna intacta; `Some(None)` = NULL.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = dossier_workflow_progress)]
pub(crate) struct ProgressChangeset {
    pub status: Option<String>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub completed_by: Option<Option<Uuid>>,
    pub decision_taken: Option<Option<bool>>,
    pub notes: Option<Option<String>>,
    pub form_data: Option<Option<Value>>,
}

impl From<&ProgressPatch> for ProgressChangeset {
    fn from(p: &ProgressPatch) -> Self {
        Self { status: p.status.map(|s| s.as_str().to_string()),
               started_at: p.started_at,
               completed_at: p.completed_at,
               completed_by: p.completed_by,
               decision_taken: p.decision_taken,
               notes: p.notes.clone(),
               form_data: p.form_data.clone() }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = workflow_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TemplateRecord {
    pub id: Uuid,
    pub world_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = workflow_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StepRecord {
    pub id: Uuid,
    pub workflow_template_id: Uuid,
    pub step_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub step_type: String,
    pub requires_decision: bool,
    pub form_fields: Value,
    pub next_step_id: Option<Uuid>,
    pub decision_yes_next_step_id: Option<Uuid>,
    pub decision_no_next_step_id: Option<Uuid>,
    pub parallel_steps: Vec<Uuid>,
    pub can_loop_back: bool,
}

impl StepRecord {
    pub fn from_step(step: &WorkflowStep) -> Result<Self, PersistenceError> {
        let form_fields =
            serde_json::to_value(&step.form_fields).map_err(|e| PersistenceError::Unknown(format!("form_fields: {e}")))?;
        Ok(Self { id: step.id,
                  workflow_template_id: step.workflow_template_id,
                  step_number: step.step_number,
                  name: step.name.clone(),
                  description: step.description.clone(),
                  step_type: step.step_type.as_str().to_string(),
                  requires_decision: step.requires_decision,
                  form_fields,
                  next_step_id: step.next_step_id,
                  decision_yes_next_step_id: step.decision_yes_next_step_id,
                  decision_no_next_step_id: step.decision_no_next_step_id,
                  parallel_steps: step.parallel_steps.clone(),
                  can_loop_back: step.can_loop_back })
    }
}

impl TryFrom<StepRecord> for WorkflowStep {
    type Error = PersistenceError;

    fn try_from(r: StepRecord) -> Result<Self, Self::Error> {
        let step_type: StepType = r.step_type.parse().map_err(PersistenceError::Corrupt)?;
        let form_fields: Vec<FormField> =
            serde_json::from_value(r.form_fields).map_err(|e| {
                                                      PersistenceError::Corrupt(format!("form_fields of step {}: {e}", r.id))
                                                  })?;
        Ok(WorkflowStep { id: r.id,
                          workflow_template_id: r.workflow_template_id,
                          step_number: r.step_number,
                          name: r.name,
                          description: r.description,
                          step_type,
                          requires_decision: r.requires_decision,
                          form_fields,
                          next_step_id: r.next_step_id,
                          decision_yes_next_step_id: r.decision_yes_next_step_id,
                          decision_no_next_step_id: r.decision_no_next_step_id,
                          parallel_steps: r.parallel_steps,
                          can_loop_back: r.can_loop_back })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = dossier_comments)]
pub(crate) struct NewCommentRow<'a> {
    pub id: Uuid,
    pub dossier_id: Uuid,
    pub author_id: Uuid,
    pub content: &'a str,
    pub comment_type: &'a str,
    pub workflow_step_id: Option<Uuid>,
    pub payload: Option<&'a Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = dossier_comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommentRecord {
    pub id: Uuid,
    pub seq: i64,
    pub dossier_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub comment_type: String,
    pub workflow_step_id: Option<Uuid>,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl CommentRecord {
    /// Entrada de auditoría con su posición dentro del dossier.
    pub fn into_audit(self, seq: u64) -> Result<AuditEntry, PersistenceError> {
        let payload = self.payload
                          .ok_or_else(|| PersistenceError::Corrupt(format!("workflow comment {} without payload", self.id)))?;
        let kind: AuditKind = serde_json::from_value(payload).map_err(|e| {
                                                                 PersistenceError::Corrupt(format!("audit payload {}: {e}",
                                                                                                   self.id))
                                                             })?;
        Ok(AuditEntry { id: self.id,
                        seq,
                        dossier_id: self.dossier_id,
                        step_id: self.workflow_step_id,
                        author_id: self.author_id,
                        kind,
                        ts: self.created_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_core::FieldKind;

    #[test]
    fn progress_record_round_trip_keeps_status_text() {
        let mut row = ProgressRow::new(Uuid::new_v4(), Uuid::new_v4());
        row.apply(&ProgressPatch::activate(Utc::now()));
        let rec = ProgressRecord::from(&row);
        assert_eq!(rec.status, "in_progress");
        assert_eq!(ProgressRow::try_from(rec).unwrap(), row);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let mut rec = ProgressRecord::from(&ProgressRow::new(Uuid::nil(), Uuid::nil()));
        rec.status = "done".into();
        assert!(matches!(ProgressRow::try_from(rec), Err(PersistenceError::Corrupt(_))));
    }

    #[test]
    fn step_record_carries_form_fields_as_json() {
        let step = WorkflowStep::new(Uuid::new_v4(), 1, "intake").with_form(vec![FormField::new("ref", true, FieldKind::Date)]);
        let rec = StepRecord::from_step(&step).unwrap();
        assert_eq!(rec.form_fields[0]["type"], serde_json::json!("date"));
        assert_eq!(WorkflowStep::try_from(rec).unwrap(), step);
    }

    #[test]
    fn reopen_patch_nulls_completion_columns() {
        let cs = ProgressChangeset::from(&ProgressPatch::reopen(Utc::now()));
        assert_eq!(cs.status.as_deref(), Some("in_progress"));
        assert_eq!(cs.completed_at, Some(None));
        assert_eq!(cs.completed_by, Some(None));
        assert!(cs.notes.is_none());
    }
}
