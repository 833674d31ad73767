use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ProgressPatch, ProgressRow, StepStatus};
use crate::audit::{AuditEntry, AuditKind};
use crate::errors::EngineError;
use crate::model::{DossierId, StepId, UserId};
use crate::template::WorkflowStep;

/// Vista transaccional sobre las filas de un dossier.
///
/// Mientras existe, el store garantiza acceso exclusivo a las filas del
/// dossier: dos transacciones sobre el mismo dossier se serializan. Todo lo
/// escrito (filas y auditoría) se publica junto al confirmar, o nada.
pub trait ProgressTx {
    /// Filas del dossier (bloqueadas), orden de `step_number`.
    fn rows(&mut self) -> Result<Vec<ProgressRow>, EngineError>;
    /// Inserta filas nuevas (inicialización).
    fn insert_rows(&mut self, rows: &[ProgressRow]) -> Result<(), EngineError>;
    /// Aplica un parche a una fila del dossier.
    fn apply(&mut self, progress_id: Uuid, patch: &ProgressPatch) -> Result<ProgressRow, EngineError>;
    /// Agrega un comentario de auditoría y devuelve la entrada completa.
    ///
    /// `ts` es el instante de la transición (el mismo que se escribe en
    /// `started_at`/`completed_at`), de modo que la entrada cae en la ventana
    /// del paso que describe.
    fn record_audit(&mut self,
                    step_id: Option<StepId>,
                    author_id: UserId,
                    kind: AuditKind,
                    ts: DateTime<Utc>)
                    -> Result<AuditEntry, EngineError>;
}

/// Almacenamiento de `DossierWorkflowProgress`.
pub trait ProgressStore {
    /// Ejecuta `f` como una unidad atómica sobre las filas de `dossier_id`.
    fn transact<T, F>(&self, dossier_id: DossierId, f: F) -> Result<T, EngineError>
        where F: FnOnce(&mut dyn ProgressTx) -> Result<T, EngineError>;

    /// Filas del dossier, orden de `step_number` (vacío si no inicializado).
    fn get_progress(&self, dossier_id: DossierId) -> Result<Vec<ProgressRow>, EngineError>;

    /// Actualización atómica de una sola fila por id.
    fn apply_transition(&self, progress_id: Uuid, patch: &ProgressPatch) -> Result<ProgressRow, EngineError>;

    /// Comentarios de auditoría del dossier por orden de inserción.
    fn audit_log(&self, dossier_id: DossierId) -> Result<Vec<AuditEntry>, EngineError>;

    /// Crea una fila por paso. Falla con `AlreadyInitialized` si el dossier ya
    /// tiene filas: el llamador debe comprobar antes.
    fn initialize_progress(&self, dossier_id: DossierId, steps: &[WorkflowStep]) -> Result<Vec<ProgressRow>, EngineError> {
        self.transact(dossier_id, |tx| initialize_in(tx, dossier_id, steps, Utc::now()))
    }
}

/// Filas iniciales: el paso con menor `step_number` arranca `in_progress`, el
/// resto `pending`. Se devuelven en orden de `step_number`.
pub fn build_initial_rows(dossier_id: DossierId, steps: &[WorkflowStep], now: DateTime<Utc>) -> Vec<ProgressRow> {
    let mut ordered: Vec<&WorkflowStep> = steps.iter().collect();
    ordered.sort_by_key(|s| s.step_number);
    ordered.iter()
           .enumerate()
           .map(|(i, step)| {
               let mut row = ProgressRow::new(dossier_id, step.id);
               if i == 0 {
                   row.status = StepStatus::InProgress;
                   row.started_at = Some(now);
               }
               row
           })
           .collect()
}

/// Inicialización dentro de una transacción ya abierta.
pub fn initialize_in(tx: &mut dyn ProgressTx,
                     dossier_id: DossierId,
                     steps: &[WorkflowStep],
                     now: DateTime<Utc>)
                     -> Result<Vec<ProgressRow>, EngineError> {
    if !tx.rows()?.is_empty() {
        return Err(EngineError::AlreadyInitialized { dossier_id });
    }
    let rows = build_initial_rows(dossier_id, steps, now);
    tx.insert_rows(&rows)?;
    Ok(rows)
}
