use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{ProgressPatch, ProgressRow, ProgressStore, ProgressTx};
use crate::audit::{AuditEntry, AuditKind};
use crate::errors::EngineError;
use crate::model::{DossierId, StepId, UserId};

#[derive(Default, Clone)]
struct DossierSlot {
    rows: Vec<ProgressRow>,
    audit: Vec<AuditEntry>,
}

/// Store en memoria.
///
/// Cada dossier vive en una entrada de un `DashMap`: la transacción retiene el
/// lock de esa entrada (serializa escritores del mismo dossier, otros dossiers
/// avanzan en paralelo) y trabaja sobre una copia que sólo se publica si `f`
/// termina en `Ok`.
#[derive(Default)]
pub struct InMemoryProgressStore {
    dossiers: DashMap<DossierId, DossierSlot>,
    /// progress_id -> dossier, para `apply_transition`.
    index: DashMap<Uuid, DossierId>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryTx {
    dossier_id: DossierId,
    staged: DossierSlot,
    inserted: Vec<Uuid>,
}

impl ProgressTx for MemoryTx {
    fn rows(&mut self) -> Result<Vec<ProgressRow>, EngineError> {
        Ok(self.staged.rows.clone())
    }

    fn insert_rows(&mut self, rows: &[ProgressRow]) -> Result<(), EngineError> {
        for row in rows {
            if row.dossier_id != self.dossier_id {
                return Err(EngineError::Internal(format!("row {} belongs to dossier {}", row.id, row.dossier_id)));
            }
            if self.staged.rows.iter().any(|r| r.workflow_step_id == row.workflow_step_id) {
                return Err(EngineError::AlreadyInitialized { dossier_id: self.dossier_id });
            }
            self.staged.rows.push(row.clone());
            self.inserted.push(row.id);
        }
        Ok(())
    }

    fn apply(&mut self, progress_id: Uuid, patch: &ProgressPatch) -> Result<ProgressRow, EngineError> {
        let row = self.staged
                      .rows
                      .iter_mut()
                      .find(|r| r.id == progress_id)
                      .ok_or(EngineError::ProgressRowNotFound { progress_id })?;
        row.apply(patch);
        Ok(row.clone())
    }

    fn record_audit(&mut self,
                    step_id: Option<StepId>,
                    author_id: UserId,
                    kind: AuditKind,
                    ts: DateTime<Utc>)
                    -> Result<AuditEntry, EngineError> {
        let entry = AuditEntry { id: Uuid::new_v4(),
                                 seq: self.staged.audit.len() as u64,
                                 dossier_id: self.dossier_id,
                                 step_id,
                                 author_id,
                                 kind,
                                 ts };
        self.staged.audit.push(entry.clone());
        Ok(entry)
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn transact<T, F>(&self, dossier_id: DossierId, f: F) -> Result<T, EngineError>
        where F: FnOnce(&mut dyn ProgressTx) -> Result<T, EngineError>
    {
        let result = {
            let mut slot = self.dossiers.entry(dossier_id).or_default();
            let mut tx = MemoryTx { dossier_id,
                                    staged: (*slot).clone(),
                                    inserted: Vec::new() };
            let out = f(&mut tx);
            if out.is_ok() {
                *slot = tx.staged;
                for id in tx.inserted {
                    self.index.insert(id, dossier_id);
                }
            }
            out
        };
        // No dejar entradas vacías creadas por transacciones fallidas o de lectura.
        self.dossiers.remove_if(&dossier_id, |_, s| s.rows.is_empty() && s.audit.is_empty());
        result
    }

    fn get_progress(&self, dossier_id: DossierId) -> Result<Vec<ProgressRow>, EngineError> {
        Ok(self.dossiers.get(&dossier_id).map(|s| s.rows.clone()).unwrap_or_default())
    }

    fn apply_transition(&self, progress_id: Uuid, patch: &ProgressPatch) -> Result<ProgressRow, EngineError> {
        let dossier_id = self.index
                             .get(&progress_id)
                             .map(|d| *d)
                             .ok_or(EngineError::ProgressRowNotFound { progress_id })?;
        self.transact(dossier_id, |tx| tx.apply(progress_id, patch))
    }

    fn audit_log(&self, dossier_id: DossierId) -> Result<Vec<AuditEntry>, EngineError> {
        Ok(self.dossiers.get(&dossier_id).map(|s| s.audit.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::StepStatus;
    use crate::template::WorkflowStep;

    fn steps() -> Vec<WorkflowStep> {
        let tid = Uuid::new_v4();
        vec![WorkflowStep::new(tid, 1, "a"), WorkflowStep::new(tid, 2, "b")]
    }

    #[test]
    fn initialize_twice_fails() {
        let store = InMemoryProgressStore::new();
        let dossier = Uuid::new_v4();
        let steps = steps();
        let rows = store.initialize_progress(dossier, &steps).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(store.initialize_progress(dossier, &steps), Err(EngineError::AlreadyInitialized { dossier_id: dossier }));
        assert_eq!(store.get_progress(dossier).unwrap(), rows);
    }

    #[test]
    fn failed_transaction_publishes_nothing() {
        let store = InMemoryProgressStore::new();
        let dossier = Uuid::new_v4();
        let rows = store.initialize_progress(dossier, &steps()).unwrap();
        let res: Result<(), EngineError> = store.transact(dossier, |tx| {
                                                    tx.apply(rows[1].id, &ProgressPatch::status(StepStatus::Blocked))?;
                                                    tx.record_audit(None, Uuid::nil(), AuditKind::StepCompleted { step_name: "b".into() }, Utc::now())?;
                                                    Err(EngineError::Internal("abort".into()))
                                                });
        assert!(res.is_err());
        assert_eq!(store.get_progress(dossier).unwrap(), rows);
        assert!(store.audit_log(dossier).unwrap().is_empty());
    }

    #[test]
    fn apply_transition_by_progress_id() {
        let store = InMemoryProgressStore::new();
        let dossier = Uuid::new_v4();
        let rows = store.initialize_progress(dossier, &steps()).unwrap();
        let updated = store.apply_transition(rows[1].id, &ProgressPatch::status(StepStatus::Skipped)).unwrap();
        assert_eq!(updated.status, StepStatus::Skipped);
        assert_eq!(store.get_progress(dossier).unwrap()[1].status, StepStatus::Skipped);
        let missing = Uuid::new_v4();
        assert_eq!(store.apply_transition(missing, &ProgressPatch::default()),
                   Err(EngineError::ProgressRowNotFound { progress_id: missing }));
    }

    #[test]
    fn reads_of_unknown_dossier_leave_no_slot() {
        let store = InMemoryProgressStore::new();
        let dossier = Uuid::new_v4();
        let rows = store.transact(dossier, |tx| tx.rows()).unwrap();
        assert!(rows.is_empty());
        assert!(store.dossiers.is_empty());
    }
}
