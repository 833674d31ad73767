use std::collections::HashMap;
use std::sync::RwLock;

use super::WorkflowTemplate;
use crate::errors::EngineError;
use crate::model::{DossierId, StepId, WorldId};

/// Fuente de plantillas (solo lectura para el core) y del mundo de cada
/// dossier.
pub trait TemplateCatalog {
    /// Plantilla activa del mundo, si existe.
    fn active_template(&self, world_id: WorldId) -> Result<Option<WorkflowTemplate>, EngineError>;
    /// Plantilla que contiene el paso (activa o no: los dossiers abiertos
    /// contra una plantilla anterior siguen progresando sobre ella).
    fn template_containing_step(&self, step_id: StepId) -> Result<Option<WorkflowTemplate>, EngineError>;
    /// Mundo al que pertenece el dossier.
    fn dossier_world(&self, dossier_id: DossierId) -> Result<Option<WorldId>, EngineError>;
}

#[derive(Default)]
struct CatalogState {
    templates: Vec<WorkflowTemplate>,
    dossiers: HashMap<DossierId, WorldId>,
}

/// Catálogo en memoria para tests y para la demo.
#[derive(Default)]
pub struct InMemoryTemplateCatalog {
    inner: RwLock<CatalogState>,
}

fn poisoned<T>(_: T) -> EngineError {
    EngineError::Internal("template catalog lock poisoned".into())
}

impl InMemoryTemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una plantilla; si es activa, desactiva las demás del mundo.
    pub fn register_template(&self, template: WorkflowTemplate) -> Result<(), EngineError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        if template.is_active {
            for t in state.templates.iter_mut().filter(|t| t.world_id == template.world_id) {
                t.is_active = false;
            }
        }
        state.templates.retain(|t| t.id != template.id);
        state.templates.push(template);
        Ok(())
    }

    pub fn register_dossier(&self, dossier_id: DossierId, world_id: WorldId) -> Result<(), EngineError> {
        self.inner.write().map_err(poisoned)?.dossiers.insert(dossier_id, world_id);
        Ok(())
    }
}

impl TemplateCatalog for InMemoryTemplateCatalog {
    fn active_template(&self, world_id: WorldId) -> Result<Option<WorkflowTemplate>, EngineError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.templates.iter().find(|t| t.world_id == world_id && t.is_active).cloned())
    }

    fn template_containing_step(&self, step_id: StepId) -> Result<Option<WorkflowTemplate>, EngineError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.templates.iter().find(|t| t.contains(step_id)).cloned())
    }

    fn dossier_world(&self, dossier_id: DossierId) -> Result<Option<WorldId>, EngineError> {
        Ok(self.inner.read().map_err(poisoned)?.dossiers.get(&dossier_id).copied())
    }
}
