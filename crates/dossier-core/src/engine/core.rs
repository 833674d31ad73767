//! Implementación del `TransitionEngine`.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::{CompleteStep, ReopenStep, StatusOverride, TransitionOutcome};
use crate::audit::AuditKind;
use crate::errors::EngineError;
use crate::form::validate_form;
use crate::model::{ActingUser, DossierId, StepId};
use crate::progress::{initialize_in, ProgressPatch, ProgressRow, ProgressStore, ProgressTx, StepStatus};
use crate::template::{resolve_successors, TemplateCatalog, WorkflowStep, WorkflowTemplate};

/// Motor de transiciones de progreso.
///
/// Todas las precondiciones que dependen del estado de las filas se evalúan
/// dentro de `ProgressStore::transact`, de modo que dos peticiones
/// concurrentes sobre el mismo dossier se ven en serie: la segunda observa la
/// escritura de la primera. Un rechazo no escribe nada.
pub struct TransitionEngine<S, C>
    where S: ProgressStore,
          C: TemplateCatalog
{
    store: S,
    catalog: C,
}

impl<S, C> TransitionEngine<S, C>
    where S: ProgressStore,
          C: TemplateCatalog
{
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Plantilla y definición del paso; `StepNotFound` si ninguna plantilla lo
    /// contiene.
    pub(crate) fn locate(&self, step_id: StepId) -> Result<(WorkflowTemplate, WorkflowStep), EngineError> {
        let template = self.catalog
                           .template_containing_step(step_id)?
                           .ok_or(EngineError::StepNotFound { step_id })?;
        let step = template.step(step_id).cloned().ok_or(EngineError::StepNotFound { step_id })?;
        Ok((template, step))
    }

    /// Crea las filas de progreso del dossier contra la plantilla activa de su
    /// mundo y registra el hash de la definición en la auditoría.
    pub fn initialize_dossier(&self, actor: &ActingUser, dossier_id: DossierId) -> Result<Vec<ProgressRow>, EngineError> {
        let world_id = self.catalog
                           .dossier_world(dossier_id)?
                           .ok_or(EngineError::DossierNotFound { dossier_id })?;
        actor.ensure_can_transition(world_id)?;
        let template = self.catalog
                           .active_template(world_id)?
                           .ok_or(EngineError::NoActiveTemplate { world_id })?;
        let steps = template.steps();
        let now = Utc::now();
        debug!("initializing dossier {dossier_id} with template {} ({} steps)", template.id, steps.len());

        let result = self.store.transact(dossier_id, |tx| {
                                   let rows = initialize_in(tx, dossier_id, &steps, now)?;
                                   tx.record_audit(None,
                                                   actor.id,
                                                   AuditKind::ProgressInitialized { definition_hash:
                                                                                        template.definition_hash()
                                                                                                .to_string(),
                                                                                    step_count: steps.len() },
                                                   now)?;
                                   Ok(rows)
                               });
        if let Err(e) = &result {
            warn!("initialize dossier {dossier_id} rejected: {e}");
        }
        result
    }

    /// Completa un paso `in_progress` y activa sus sucesores pendientes.
    ///
    /// Orden de comprobación: paso conocido, permisos, fila existente, ya
    /// completado, paso activo, decisión presente, formulario válido.
    pub fn complete_step(&self, actor: &ActingUser, req: &CompleteStep) -> Result<TransitionOutcome, EngineError> {
        debug!("complete_step dossier={} step={} by {}", req.dossier_id, req.step_id, actor.id);
        let result = self.complete_step_inner(actor, req, Utc::now());
        match &result {
            Ok(outcome) => debug!("step {} completed, activated {:?}", req.step_id, outcome.activated),
            Err(e) => warn!("complete_step {} on dossier {} rejected: {e}", req.step_id, req.dossier_id),
        }
        result
    }

    fn complete_step_inner(&self,
                           actor: &ActingUser,
                           req: &CompleteStep,
                           now: DateTime<Utc>)
                           -> Result<TransitionOutcome, EngineError> {
        let (template, step) = self.locate(req.step_id)?;
        actor.ensure_can_transition(template.world_id)?;

        self.store.transact(req.dossier_id, |tx| {
                      let rows = tx.rows()?;
                      let row = find_row(&rows, req.dossier_id, step.id)?;
                      match row.status {
                          StepStatus::InProgress => {}
                          StepStatus::Completed => return Err(EngineError::AlreadyCompleted { step_id: step.id }),
                          status => return Err(EngineError::StepNotActive { step_id: step.id, status }),
                      }
                      if step.requires_decision && req.decision.is_none() {
                          return Err(EngineError::DecisionRequired { step_id: step.id });
                      }
                      validate_form(&step.form_fields, req.form_data.as_ref())?;

                      let decision = if step.requires_decision { req.decision } else { None };
                      let successors = resolve_successors(&step, decision)?;
                      let completed = tx.apply(row.id,
                                               &ProgressPatch::complete(now,
                                                                        actor.id,
                                                                        decision,
                                                                        req.notes.clone(),
                                                                        req.form_data.clone()))?;
                      let activated = activate_pending(tx, &rows, &successors, now)?;

                      let kind = match decision {
                          Some(decision) => AuditKind::DecisionTaken { step_name: step.name.clone(), decision },
                          None => AuditKind::StepCompleted { step_name: step.name.clone() },
                      };
                      let audit = tx.record_audit(Some(step.id), actor.id, kind, now)?;
                      Ok(TransitionOutcome { step: completed,
                                             activated,
                                             progress: tx.rows()?,
                                             audit })
                  })
    }

    /// Reabre un paso completado marcado `can_loop_back`.
    ///
    /// Sólo se permite cuando el flujo ya avanzó más allá del paso (algún paso
    /// con `step_number` mayor arrancó o terminó). Los pasos posteriores no se
    /// tocan.
    pub fn reopen_step(&self, actor: &ActingUser, req: &ReopenStep) -> Result<TransitionOutcome, EngineError> {
        debug!("reopen_step dossier={} step={} by {}", req.dossier_id, req.step_id, actor.id);
        let now = Utc::now();
        let result = (|| {
            let (template, step) = self.locate(req.step_id)?;
            actor.ensure_can_transition(template.world_id)?;
            if !step.can_loop_back {
                return Err(EngineError::NotReopenable { step_id: step.id,
                                                        reason: "step does not allow loop-back".into() });
            }

            self.store.transact(req.dossier_id, |tx| {
                          let rows = tx.rows()?;
                          let row = find_row(&rows, req.dossier_id, step.id)?;
                          if row.status != StepStatus::Completed {
                              return Err(EngineError::StepNotActive { step_id: step.id, status: row.status });
                          }
                          let advanced = template.ordered_steps()
                                                 .filter(|s| s.step_number > step.step_number)
                                                 .filter_map(|s| rows.iter().find(|r| r.workflow_step_id == s.id))
                                                 .any(|r| r.started_at.is_some() || r.is_completed());
                          if !advanced {
                              return Err(EngineError::NotReopenable { step_id: step.id,
                                                                      reason: "no later step has started".into() });
                          }

                          let reopened = tx.apply(row.id, &ProgressPatch::reopen(now))?;
                          let audit = tx.record_audit(Some(step.id),
                                                      actor.id,
                                                      AuditKind::StepReopened { step_name: step.name.clone(),
                                                                                reason: req.reason.clone() },
                                                      now)?;
                          Ok(TransitionOutcome { step: reopened,
                                                 activated: Vec::new(),
                                                 progress: tx.rows()?,
                                                 audit })
                      })
        })();
        if let Err(e) = &result {
            warn!("reopen_step {} on dossier {} rejected: {e}", req.step_id, req.dossier_id);
        }
        result
    }

    /// Override administrativo (admin/manager).
    ///
    /// `Skip` de un paso no-decisión activa sus sucesores pendientes como si
    /// se hubiera completado; un paso de decisión saltado no elige rama.
    pub fn override_status(&self,
                           actor: &ActingUser,
                           dossier_id: DossierId,
                           step_id: StepId,
                           op: StatusOverride)
                           -> Result<TransitionOutcome, EngineError> {
        debug!("override_status {op:?} dossier={dossier_id} step={step_id} by {}", actor.id);
        let now = Utc::now();
        let result = (|| {
            let (template, step) = self.locate(step_id)?;
            actor.ensure_administrator(template.world_id)?;

            self.store.transact(dossier_id, |tx| {
                          let rows = tx.rows()?;
                          let row = find_row(&rows, dossier_id, step.id)?;
                          let target = match op {
                              StatusOverride::Block => StepStatus::Blocked,
                              StatusOverride::Skip => StepStatus::Skipped,
                              StatusOverride::Unblock if row.started_at.is_some() => StepStatus::InProgress,
                              StatusOverride::Unblock => StepStatus::Pending,
                          };
                          if !op.allowed_from().contains(&row.status) {
                              return Err(EngineError::InvalidTransition { step_id: step.id,
                                                                          from: row.status,
                                                                          to: target });
                          }

                          let updated = tx.apply(row.id, &ProgressPatch::status(target))?;
                          let activated = if op == StatusOverride::Skip && !step.requires_decision {
                              activate_pending(tx, &rows, &resolve_successors(&step, None)?, now)?
                          } else {
                              Vec::new()
                          };
                          let audit = tx.record_audit(Some(step.id),
                                                      actor.id,
                                                      AuditKind::StatusOverridden { step_name: step.name.clone(),
                                                                                    status: target },
                                                      now)?;
                          Ok(TransitionOutcome { step: updated,
                                                 activated,
                                                 progress: tx.rows()?,
                                                 audit })
                      })
        })();
        if let Err(e) = &result {
            warn!("override_status {op:?} on step {step_id} rejected: {e}");
        }
        result
    }
}

fn find_row(rows: &[ProgressRow], dossier_id: DossierId, step_id: StepId) -> Result<&ProgressRow, EngineError> {
    rows.iter()
        .find(|r| r.workflow_step_id == step_id)
        .ok_or(EngineError::ProgressNotFound { dossier_id, step_id })
}

/// Pasa a `in_progress` los sucesores que siguen `pending`; cualquier otro
/// estado se deja intacto (nunca se reabre un paso completado).
fn activate_pending(tx: &mut dyn ProgressTx,
                    rows: &[ProgressRow],
                    successors: &[StepId],
                    now: DateTime<Utc>)
                    -> Result<Vec<StepId>, EngineError> {
    let mut activated = Vec::new();
    for succ in successors {
        match rows.iter().find(|r| r.workflow_step_id == *succ) {
            Some(r) if r.status == StepStatus::Pending => {
                tx.apply(r.id, &ProgressPatch::activate(now))?;
                activated.push(*succ);
            }
            Some(_) => {}
            None => warn!("successor {succ} has no progress row in dossier"),
        }
    }
    Ok(activated)
}
