use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{debug, error};
use std::collections::HashMap;
use uuid::Uuid;

use dossier_core::progress::{ProgressPatch, ProgressRow, ProgressStore, ProgressTx};
use dossier_core::{AuditEntry, AuditKind, DossierId, EngineError, StepId, UserId};

use super::records::{CommentRecord, NewCommentRow, ProgressChangeset, ProgressRecord, WORKFLOW_COMMENT};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{dossier_comments, dossier_workflow_progress as dwp, dossiers, workflow_steps};

/// `ProgressStore` sobre `dossier_workflow_progress`.
pub struct PgProgressStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgProgressStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

/// Filas del dossier ordenadas por `step_number`. Con `lock` toma
/// `FOR UPDATE` sobre ellas.
fn load_rows(conn: &mut PgConnection, dossier_id: DossierId, lock: bool) -> Result<Vec<ProgressRow>, PersistenceError> {
    let query = dwp::table.filter(dwp::dossier_id.eq(dossier_id)).select(ProgressRecord::as_select());
    let records: Vec<ProgressRecord> = if lock { query.for_update().load(conn)? } else { query.load(conn)? };

    let step_ids: Vec<Uuid> = records.iter().map(|r| r.workflow_step_id).collect();
    let numbers: HashMap<Uuid, i32> = workflow_steps::table.filter(workflow_steps::id.eq_any(&step_ids))
                                                           .select((workflow_steps::id, workflow_steps::step_number))
                                                           .load::<(Uuid, i32)>(conn)?
                                                           .into_iter()
                                                           .collect();
    let mut rows = records.into_iter()
                          .map(ProgressRow::try_from)
                          .collect::<Result<Vec<_>, _>>()?;
    rows.sort_by_key(|r| numbers.get(&r.workflow_step_id).copied().unwrap_or(i32::MAX));
    Ok(rows)
}

fn load_audit(conn: &mut PgConnection, dossier_id: DossierId) -> Result<Vec<AuditEntry>, PersistenceError> {
    let records: Vec<CommentRecord> = dossier_comments::table.filter(dossier_comments::dossier_id.eq(dossier_id))
                                                             .filter(dossier_comments::comment_type.eq(WORKFLOW_COMMENT))
                                                             .order(dossier_comments::seq.asc())
                                                             .select(CommentRecord::as_select())
                                                             .load(conn)?;
    records.into_iter()
           .enumerate()
           .map(|(i, r)| r.into_audit(i as u64))
           .collect()
}

/// Vista transaccional: la conexión está dentro de una transacción con la
/// fila del dossier y sus filas de progreso bloqueadas.
struct PgTx<'c> {
    conn: &'c mut PgConnection,
    dossier_id: DossierId,
}

impl PgTx<'_> {
    fn insert(&mut self, rows: &[ProgressRow]) -> Result<(), PersistenceError> {
        let records: Vec<ProgressRecord> = rows.iter().map(ProgressRecord::from).collect();
        diesel::insert_into(dwp::table).values(&records).execute(self.conn)?;
        Ok(())
    }

    fn update(&mut self, progress_id: Uuid, patch: &ProgressPatch) -> Result<Option<ProgressRow>, PersistenceError> {
        let target = dwp::table.filter(dwp::id.eq(progress_id)).filter(dwp::dossier_id.eq(self.dossier_id));
        // Un changeset vacío no es una sentencia válida: se lee la fila tal cual.
        let record: Option<ProgressRecord> = if *patch == ProgressPatch::default() {
            target.select(ProgressRecord::as_select()).first(self.conn).optional()?
        } else {
            diesel::update(target).set(&ProgressChangeset::from(patch))
                                  .returning(ProgressRecord::as_returning())
                                  .get_result(self.conn)
                                  .optional()?
        };
        record.map(ProgressRow::try_from).transpose()
    }

    fn audit(&mut self,
             step_id: Option<StepId>,
             author_id: UserId,
             kind: AuditKind,
             ts: DateTime<Utc>)
             -> Result<AuditEntry, PersistenceError> {
        let seq: i64 = dossier_comments::table.filter(dossier_comments::dossier_id.eq(self.dossier_id))
                                              .filter(dossier_comments::comment_type.eq(WORKFLOW_COMMENT))
                                              .count()
                                              .get_result(self.conn)?;
        let payload = serde_json::to_value(&kind).map_err(|e| PersistenceError::Unknown(format!("audit payload: {e}")))?;
        let entry = AuditEntry { id: Uuid::new_v4(),
                                 seq: seq as u64,
                                 dossier_id: self.dossier_id,
                                 step_id,
                                 author_id,
                                 kind,
                                 ts };
        let content = entry.message();
        diesel::insert_into(dossier_comments::table).values(NewCommentRow { id: entry.id,
                                                                           dossier_id: entry.dossier_id,
                                                                           author_id,
                                                                           content: &content,
                                                                           comment_type: WORKFLOW_COMMENT,
                                                                           workflow_step_id: step_id,
                                                                           payload: Some(&payload),
                                                                           created_at: entry.ts })
                                                    .execute(self.conn)?;
        Ok(entry)
    }
}

impl ProgressTx for PgTx<'_> {
    fn rows(&mut self) -> Result<Vec<ProgressRow>, EngineError> {
        Ok(load_rows(self.conn, self.dossier_id, true)?)
    }

    fn insert_rows(&mut self, rows: &[ProgressRow]) -> Result<(), EngineError> {
        match self.insert(rows) {
            Err(PersistenceError::UniqueViolation(_)) => Err(EngineError::AlreadyInitialized { dossier_id: self.dossier_id }),
            other => Ok(other?),
        }
    }

    fn apply(&mut self, progress_id: Uuid, patch: &ProgressPatch) -> Result<ProgressRow, EngineError> {
        self.update(progress_id, patch)?
            .ok_or(EngineError::ProgressRowNotFound { progress_id })
    }

    fn record_audit(&mut self,
                    step_id: Option<StepId>,
                    author_id: UserId,
                    kind: AuditKind,
                    ts: DateTime<Utc>)
                    -> Result<AuditEntry, EngineError> {
        Ok(self.audit(step_id, author_id, kind, ts)?)
    }
}

impl<P: ConnectionProvider> ProgressStore for PgProgressStore<P> {
    fn transact<T, F>(&self, dossier_id: DossierId, f: F) -> Result<T, EngineError>
        where F: FnOnce(&mut dyn ProgressTx) -> Result<T, EngineError>
    {
        debug!("transact:start dossier_id={dossier_id}");
        let mut conn = with_retry(|| self.provider.connection())?;
        let result = conn.build_transaction().read_write().run(|tx_conn| {
                                                              // Serializa a todos los escritores del dossier, incluida
                                                              // la inicialización (sin filas de progreso aún).
                                                              dossiers::table.find(dossier_id)
                                                                             .select(dossiers::id)
                                                                             .for_update()
                                                                             .first::<Uuid>(tx_conn)
                                                                             .optional()?;
                                                              let mut tx = PgTx { conn: tx_conn, dossier_id };
                                                              f(&mut tx).map_err(PersistenceError::Engine)
                                                          });
        match &result {
            Ok(_) => debug!("transact:commit dossier_id={dossier_id}"),
            Err(PersistenceError::Engine(e)) => debug!("transact:rollback dossier_id={dossier_id} reason={e}"),
            Err(e) => error!("transact:failed dossier_id={dossier_id} err={e:?}"),
        }
        Ok(result?)
    }

    fn get_progress(&self, dossier_id: DossierId) -> Result<Vec<ProgressRow>, EngineError> {
        Ok(with_retry(|| {
               let mut conn = self.provider.connection()?;
               load_rows(&mut conn, dossier_id, false)
           })?)
    }

    fn apply_transition(&self, progress_id: Uuid, patch: &ProgressPatch) -> Result<ProgressRow, EngineError> {
        let dossier_id: Option<Uuid> = with_retry(|| {
                                           let mut conn = self.provider.connection()?;
                                           Ok(dwp::table.find(progress_id)
                                                        .select(dwp::dossier_id)
                                                        .first::<Uuid>(&mut conn)
                                                        .optional()?)
                                       })?;
        let dossier_id = dossier_id.ok_or(EngineError::ProgressRowNotFound { progress_id })?;
        self.transact(dossier_id, |tx| tx.apply(progress_id, patch))
    }

    fn audit_log(&self, dossier_id: DossierId) -> Result<Vec<AuditEntry>, EngineError> {
        Ok(with_retry(|| {
               let mut conn = self.provider.connection()?;
               load_audit(&mut conn, dossier_id)
           })
           .map_err(|e| {
               error!("audit_log:load error dossier_id={dossier_id} err={e:?}");
               e
           })?)
    }
}
