use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use super::{Edge, EdgeKind, WorkflowStep};
use crate::constants::ENGINE_VERSION;
use crate::errors::EngineError;
use crate::form::check_patterns;
use crate::hashing::hash_value;
use crate::model::{StepId, WorldId};

/// Definición inmutable de un workflow para un mundo.
///
/// Los pasos se guardan ordenados por `step_number` (orden de despliegue por
/// defecto, que no necesariamente coincide con el recorrido real cuando hay
/// ramas o bucles).
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowTemplate {
    pub id: Uuid,
    pub world_id: WorldId,
    pub name: String,
    pub is_active: bool,
    steps: IndexMap<StepId, WorkflowStep>,
    definition_hash: String,
}

impl WorkflowTemplate {
    /// Valida y construye la plantilla.
    ///
    /// Rechaza ids o `step_number` duplicados, números < 1, sucesores fuera de
    /// la plantilla, pasos de otra plantilla y sucesores de decisión en pasos
    /// que no requieren decisión.
    pub fn new(id: Uuid,
               world_id: WorldId,
               name: impl Into<String>,
               is_active: bool,
               mut steps: Vec<WorkflowStep>)
               -> Result<Self, EngineError> {
        steps.sort_by_key(|s| s.step_number);

        let mut numbers = HashSet::new();
        let mut map = IndexMap::with_capacity(steps.len());
        for step in steps {
            if step.workflow_template_id != id {
                return Err(EngineError::InvalidTemplate(format!("step {} belongs to template {}",
                                                                step.id, step.workflow_template_id)));
            }
            if step.step_number < 1 || !numbers.insert(step.step_number) {
                return Err(EngineError::InvalidTemplate(format!("invalid or duplicated step_number {}", step.step_number)));
            }
            if !step.requires_decision
               && (step.decision_yes_next_step_id.is_some() || step.decision_no_next_step_id.is_some())
            {
                return Err(EngineError::InvalidTemplate(format!("step {} has decision successors but requires no decision",
                                                                step.id)));
            }
            check_patterns(&step.form_fields).map_err(|e| EngineError::InvalidTemplate(format!("step {}: {e}", step.id)))?;
            let step_id = step.id;
            if map.insert(step_id, step).is_some() {
                return Err(EngineError::InvalidTemplate(format!("duplicated step id {step_id}")));
            }
        }

        for step in map.values() {
            if let Some(dangling) = step.referenced_ids().find(|sid| !map.contains_key(sid)) {
                return Err(EngineError::InvalidTemplate(format!("step {} references unknown successor {dangling}",
                                                                step.id)));
            }
        }

        let definition_hash = compute_definition_hash(&map)?;
        Ok(Self { id,
                  world_id,
                  name: name.into(),
                  is_active,
                  steps: map,
                  definition_hash })
    }

    pub fn step(&self, id: StepId) -> Option<&WorkflowStep> {
        self.steps.get(&id)
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.steps.contains_key(&id)
    }

    /// Pasos por `step_number` ascendente.
    pub fn ordered_steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.steps.values()
    }

    pub fn steps(&self) -> Vec<WorkflowStep> {
        self.steps.values().cloned().collect()
    }

    pub fn first_step(&self) -> Option<&WorkflowStep> {
        self.steps.values().next()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Hash del grafo (blake3 sobre JSON canónico) para detectar ediciones.
    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    /// Aristas etiquetadas del grafo.
    ///
    /// Las aristas `LoopBack` van desde cada paso posterior (mayor
    /// `step_number`) hacia un paso marcado `can_loop_back`: son las
    /// reaperturas que `reopen_step` puede ejecutar.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for step in self.steps.values() {
            if step.requires_decision {
                if let Some(to) = step.decision_yes_next_step_id {
                    edges.push(Edge { from: step.id, to, kind: EdgeKind::DecisionYes });
                }
                if let Some(to) = step.decision_no_next_step_id {
                    edges.push(Edge { from: step.id, to, kind: EdgeKind::DecisionNo });
                }
            } else if let Some(to) = step.next_step_id {
                edges.push(Edge { from: step.id, to, kind: EdgeKind::Linear });
            }
            for to in &step.parallel_steps {
                edges.push(Edge { from: step.id, to: *to, kind: EdgeKind::Parallel });
            }
        }
        for target in self.steps.values().filter(|s| s.can_loop_back) {
            for later in self.steps.values().filter(|s| s.step_number > target.step_number) {
                edges.push(Edge { from: later.id, to: target.id, kind: EdgeKind::LoopBack });
            }
        }
        edges
    }
}

fn compute_definition_hash(steps: &IndexMap<StepId, WorkflowStep>) -> Result<String, EngineError> {
    let steps_json: Vec<serde_json::Value> =
        steps.values()
             .map(serde_json::to_value)
             .collect::<Result<_, _>>()
             .map_err(|e| EngineError::Internal(format!("serialize steps: {e}")))?;
    Ok(hash_value(&json!({
        "engine_version": ENGINE_VERSION,
        "steps": steps_json,
    })))
}
