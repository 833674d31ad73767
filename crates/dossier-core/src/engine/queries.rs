//! Lecturas del motor: progreso, resumen y línea de tiempo de un dossier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TransitionEngine;
use crate::errors::EngineError;
use crate::model::{ActingUser, DossierId, StepId, WorldId};
use crate::progress::{ProgressRow, ProgressStore, StepStatus};
use crate::template::{TemplateCatalog, WorkflowTemplate};
use crate::timeline::{compose_timeline, SideEvent, SideEventSource, Timeline};

/// Resumen de avance para cabeceras y listados.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
    pub skipped: usize,
    /// Pasos cerrados (completados o saltados) sobre el total, 0..=100.
    pub percent: u8,
    pub active_steps: Vec<StepId>,
    /// Nada en curso ni bloqueado. Los pasos pendientes de ramas no tomadas no
    /// cuentan.
    pub finished: bool,
}

impl ProgressSummary {
    pub fn from_rows(rows: &[ProgressRow]) -> Self {
        let mut s = ProgressSummary { total: rows.len(), ..Default::default() };
        for row in rows {
            match row.status {
                StepStatus::Completed => s.completed += 1,
                StepStatus::InProgress => {
                    s.in_progress += 1;
                    s.active_steps.push(row.workflow_step_id);
                }
                StepStatus::Pending => s.pending += 1,
                StepStatus::Blocked => s.blocked += 1,
                StepStatus::Skipped => s.skipped += 1,
            }
        }
        if s.total > 0 {
            s.percent = (((s.completed + s.skipped) * 100) / s.total) as u8;
        }
        s.finished = s.total > 0 && s.in_progress == 0 && s.blocked == 0;
        s
    }
}

impl<S, C> TransitionEngine<S, C>
    where S: ProgressStore,
          C: TemplateCatalog
{
    fn readable_world(&self, actor: &ActingUser, dossier_id: DossierId) -> Result<WorldId, EngineError> {
        let world_id = self.catalog()
                           .dossier_world(dossier_id)?
                           .ok_or(EngineError::DossierNotFound { dossier_id })?;
        actor.ensure_world(world_id)?;
        Ok(world_id)
    }

    /// Plantilla contra la que progresa el dossier: la de sus filas si ya fue
    /// inicializado, si no la activa del mundo.
    fn dossier_template(&self, world_id: WorldId, rows: &[ProgressRow]) -> Result<WorkflowTemplate, EngineError> {
        if let Some(row) = rows.first() {
            if let Some(template) = self.catalog().template_containing_step(row.workflow_step_id)? {
                return Ok(template);
            }
        }
        self.catalog()
            .active_template(world_id)?
            .ok_or(EngineError::NoActiveTemplate { world_id })
    }

    /// Filas del dossier en orden de `step_number`.
    pub fn progress(&self, actor: &ActingUser, dossier_id: DossierId) -> Result<Vec<ProgressRow>, EngineError> {
        self.readable_world(actor, dossier_id)?;
        self.store().get_progress(dossier_id)
    }

    pub fn summary(&self, actor: &ActingUser, dossier_id: DossierId) -> Result<ProgressSummary, EngineError> {
        Ok(ProgressSummary::from_rows(&self.progress(actor, dossier_id)?))
    }

    /// Línea de tiempo del dossier: eventos de `source` más los comentarios de
    /// auditoría del motor, agrupados por ventana temporal de paso.
    pub fn timeline<E>(&self,
                       actor: &ActingUser,
                       dossier_id: DossierId,
                       source: &E,
                       now: DateTime<Utc>)
                       -> Result<Timeline, EngineError>
        where E: SideEventSource + ?Sized
    {
        let world_id = self.readable_world(actor, dossier_id)?;
        let rows = self.store().get_progress(dossier_id)?;
        let template = self.dossier_template(world_id, &rows)?;
        let steps = template.steps();
        let step_ids: Vec<StepId> = steps.iter().map(|s| s.id).collect();

        let mut events = source.side_events(dossier_id, &step_ids)?;
        events.extend(self.store().audit_log(dossier_id)?.iter().map(SideEvent::from));
        Ok(compose_timeline(&steps, &rows, events, now))
    }
}
