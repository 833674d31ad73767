use diesel::prelude::*;
use log::debug;
use uuid::Uuid;

use dossier_core::{DossierId, EngineError, StepId, TemplateCatalog, WorkflowStep, WorkflowTemplate, WorldId};

use super::records::{StepRecord, TemplateRecord};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{dossiers, workflow_steps, workflow_templates};

/// `TemplateCatalog` sobre `workflow_templates` / `workflow_steps` /
/// `dossiers`. Solo lectura para el motor; las altas son para seeding y tests.
pub struct PgTemplateCatalog<P: ConnectionProvider> {
    pub provider: P,
}

fn load_template(conn: &mut PgConnection, record: TemplateRecord) -> Result<WorkflowTemplate, PersistenceError> {
    let steps: Vec<WorkflowStep> = workflow_steps::table.filter(workflow_steps::workflow_template_id.eq(record.id))
                                                        .order(workflow_steps::step_number.asc())
                                                        .select(StepRecord::as_select())
                                                        .load(conn)?
                                                        .into_iter()
                                                        .map(WorkflowStep::try_from)
                                                        .collect::<Result<_, _>>()?;
    // Una plantilla persistida inválida es un dato corrupto, no un error del llamador.
    WorkflowTemplate::new(record.id, record.world_id, record.name, record.is_active, steps).map_err(|e| {
        PersistenceError::Corrupt(format!("template {}: {e}", record.id))
    })
}

impl<P: ConnectionProvider> PgTemplateCatalog<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Inserta plantilla y pasos en una transacción. Si es activa, desactiva
    /// antes la activa previa del mundo.
    pub fn insert_template(&self, template: &WorkflowTemplate) -> Result<(), PersistenceError> {
        let steps = template.steps()
                            .iter()
                            .map(StepRecord::from_step)
                            .collect::<Result<Vec<_>, _>>()?;
        let record = TemplateRecord { id: template.id,
                                      world_id: template.world_id,
                                      name: template.name.clone(),
                                      is_active: template.is_active,
                                      created_at: chrono::Utc::now() };
        let mut conn = self.provider.connection()?;
        conn.build_transaction().read_write().run(|tx_conn| {
                                                if record.is_active {
                                                    diesel::update(workflow_templates::table.filter(workflow_templates::world_id.eq(record.world_id))
                                                                                            .filter(workflow_templates::is_active.eq(true)))
                                                        .set(workflow_templates::is_active.eq(false))
                                                        .execute(tx_conn)?;
                                                }
                                                diesel::insert_into(workflow_templates::table).values(&record).execute(tx_conn)?;
                                                diesel::insert_into(workflow_steps::table).values(&steps).execute(tx_conn)?;
                                                Ok::<(), PersistenceError>(())
                                            })?;
        debug!("insert_template:done id={} steps={}", template.id, template.len());
        Ok(())
    }

    pub fn insert_dossier(&self, dossier_id: DossierId, world_id: WorldId, title: &str) -> Result<(), PersistenceError> {
        let mut conn = self.provider.connection()?;
        diesel::insert_into(dossiers::table).values((dossiers::id.eq(dossier_id),
                                                     dossiers::world_id.eq(world_id),
                                                     dossiers::title.eq(title)))
                                            .execute(&mut conn)?;
        Ok(())
    }
}

impl<P: ConnectionProvider> TemplateCatalog for PgTemplateCatalog<P> {
    fn active_template(&self, world_id: WorldId) -> Result<Option<WorkflowTemplate>, EngineError> {
        Ok(with_retry(|| {
               let mut conn = self.provider.connection()?;
               let record = workflow_templates::table.filter(workflow_templates::world_id.eq(world_id))
                                                     .filter(workflow_templates::is_active.eq(true))
                                                     .select(TemplateRecord::as_select())
                                                     .first(&mut conn)
                                                     .optional()?;
               record.map(|r| load_template(&mut conn, r)).transpose()
           })?)
    }

    fn template_containing_step(&self, step_id: StepId) -> Result<Option<WorkflowTemplate>, EngineError> {
        Ok(with_retry(|| {
               let mut conn = self.provider.connection()?;
               let record = workflow_steps::table.inner_join(workflow_templates::table)
                                                 .filter(workflow_steps::id.eq(step_id))
                                                 .select(TemplateRecord::as_select())
                                                 .first(&mut conn)
                                                 .optional()?;
               record.map(|r| load_template(&mut conn, r)).transpose()
           })?)
    }

    fn dossier_world(&self, dossier_id: DossierId) -> Result<Option<WorldId>, EngineError> {
        Ok(with_retry(|| {
               let mut conn = self.provider.connection()?;
               Ok(dossiers::table.find(dossier_id)
                                 .select(dossiers::world_id)
                                 .first::<Uuid>(&mut conn)
                                 .optional()?)
           })?)
    }
}
