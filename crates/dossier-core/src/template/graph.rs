use serde::{Deserialize, Serialize};

use super::WorkflowStep;
use crate::errors::EngineError;
use crate::model::StepId;

/// Tipo de arista del grafo, para el diagrama y para razonar sobre
/// reaperturas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Linear,
    DecisionYes,
    DecisionNo,
    Parallel,
    LoopBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: StepId,
    pub to: StepId,
    pub kind: EdgeKind,
}

/// Sucesores a activar tras completar `step`.
///
/// - Paso de decisión: `[yes]` con `Some(true)`, `[no]` con `Some(false)`,
///   `InvalidDecision` sin decisión.
/// - Paso normal: `[next]` seguido de `parallel_steps` (nunca excluyentes).
/// - Terminal: vacío.
pub fn resolve_successors(step: &WorkflowStep, decision: Option<bool>) -> Result<Vec<StepId>, EngineError> {
    if step.requires_decision {
        let target = match decision {
            Some(true) => step.decision_yes_next_step_id,
            Some(false) => step.decision_no_next_step_id,
            None => return Err(EngineError::InvalidDecision { step_id: step.id }),
        };
        return Ok(target.into_iter().collect());
    }

    let mut out: Vec<StepId> = step.next_step_id.into_iter().collect();
    for id in &step.parallel_steps {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    Ok(out)
}
