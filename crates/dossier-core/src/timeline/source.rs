use std::collections::HashMap;
use std::sync::RwLock;

use super::SideEvent;
use crate::errors::EngineError;
use crate::model::{DossierId, StepId};

/// Origen de los eventos laterales de un dossier (comentarios, documentos,
/// tareas, citas, anotaciones).
pub trait SideEventSource {
    /// Eventos del dossier más los que no tienen dossier pero están
    /// etiquetados con alguno de `step_ids` (los pasos de la plantilla).
    /// No filtra por tiempo.
    fn side_events(&self, dossier_id: DossierId, step_ids: &[StepId]) -> Result<Vec<SideEvent>, EngineError>;
}

#[derive(Default)]
pub struct InMemorySideEventSource {
    events: RwLock<HashMap<DossierId, Vec<SideEvent>>>,
    by_step: RwLock<HashMap<StepId, Vec<SideEvent>>>,
}

fn poisoned<T>(_: T) -> EngineError {
    EngineError::Internal("side event source lock poisoned".into())
}

impl InMemorySideEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, dossier_id: DossierId, event: SideEvent) -> Result<(), EngineError> {
        let mut guard = self.events.write().map_err(poisoned)?;
        guard.entry(dossier_id).or_default().push(event);
        Ok(())
    }

    /// Evento sin dossier, ligado a un paso de plantilla (p. ej. una tarea
    /// genérica del paso). Aparece en todos los dossiers de esa plantilla.
    pub fn record_for_step(&self, step_id: StepId, event: SideEvent) -> Result<(), EngineError> {
        let mut guard = self.by_step.write().map_err(poisoned)?;
        guard.entry(step_id)
             .or_default()
             .push(SideEvent { workflow_step_id: Some(step_id), ..event });
        Ok(())
    }
}

impl SideEventSource for InMemorySideEventSource {
    fn side_events(&self, dossier_id: DossierId, step_ids: &[StepId]) -> Result<Vec<SideEvent>, EngineError> {
        let mut out = self.events.read().map_err(poisoned)?.get(&dossier_id).cloned().unwrap_or_default();
        let by_step = self.by_step.read().map_err(poisoned)?;
        out.extend(step_ids.iter().filter_map(|id| by_step.get(id)).flatten().cloned());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::SideEventKind;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn events_are_scoped_per_dossier() {
        let source = InMemorySideEventSource::new();
        let a = Uuid::new_v4();
        source.record(a, SideEvent::new(SideEventKind::Task, Utc::now(), "call")).unwrap();
        assert_eq!(source.side_events(a, &[]).unwrap().len(), 1);
        assert!(source.side_events(Uuid::new_v4(), &[]).unwrap().is_empty());
    }

    #[test]
    fn step_tagged_events_follow_the_requested_steps() {
        let source = InMemorySideEventSource::new();
        let (dossier, step, other_step) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        source.record(dossier, SideEvent::new(SideEventKind::Comment, Utc::now(), "note")).unwrap();
        source.record_for_step(step, SideEvent::new(SideEventKind::Task, Utc::now(), "check id")).unwrap();

        let events = source.side_events(dossier, &[step]).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].workflow_step_id, Some(step));
        // Otro dossier de la misma plantilla también ve la tarea del paso.
        assert_eq!(source.side_events(Uuid::new_v4(), &[step]).unwrap().len(), 1);
        assert_eq!(source.side_events(dossier, &[other_step]).unwrap().len(), 1);
    }
}
