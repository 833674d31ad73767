use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::form::FormField;
use crate::model::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Action,
    Decision,
    Document,
    Meeting,
    Notification,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Action => "action",
            StepType::Decision => "decision",
            StepType::Document => "document",
            StepType::Meeting => "meeting",
            StepType::Notification => "notification",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(StepType::Action),
            "decision" => Ok(StepType::Decision),
            "document" => Ok(StepType::Document),
            "meeting" => Ok(StepType::Meeting),
            "notification" => Ok(StepType::Notification),
            other => Err(format!("unknown step type '{other}'")),
        }
    }
}

/// Nodo del grafo. Los sucesores `decision_*` sólo son válidos cuando
/// `requires_decision`; `parallel_steps` es informativo (sin join).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: StepId,
    pub workflow_template_id: Uuid,
    pub step_number: i32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub step_type: StepType,
    #[serde(default)]
    pub requires_decision: bool,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
    #[serde(default)]
    pub next_step_id: Option<StepId>,
    #[serde(default)]
    pub decision_yes_next_step_id: Option<StepId>,
    #[serde(default)]
    pub decision_no_next_step_id: Option<StepId>,
    #[serde(default)]
    pub parallel_steps: Vec<StepId>,
    #[serde(default)]
    pub can_loop_back: bool,
}

impl WorkflowStep {
    /// Paso de acción lineal sin sucesores; se completa con los setters.
    pub fn new(template_id: Uuid, step_number: i32, name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               workflow_template_id: template_id,
               step_number,
               name: name.into(),
               description: None,
               step_type: StepType::Action,
               requires_decision: false,
               form_fields: vec![],
               next_step_id: None,
               decision_yes_next_step_id: None,
               decision_no_next_step_id: None,
               parallel_steps: vec![],
               can_loop_back: false }
    }

    pub fn then(mut self, next: StepId) -> Self {
        self.next_step_id = Some(next);
        self
    }

    pub fn decision(mut self, yes: Option<StepId>, no: Option<StepId>) -> Self {
        self.step_type = StepType::Decision;
        self.requires_decision = true;
        self.decision_yes_next_step_id = yes;
        self.decision_no_next_step_id = no;
        self
    }

    pub fn parallel(mut self, steps: Vec<StepId>) -> Self {
        self.parallel_steps = steps;
        self
    }

    pub fn with_form(mut self, fields: Vec<FormField>) -> Self {
        self.form_fields = fields;
        self
    }

    pub fn loop_back(mut self) -> Self {
        self.can_loop_back = true;
        self
    }

    /// Todos los ids referenciados como sucesores (para validar la plantilla).
    pub fn referenced_ids(&self) -> impl Iterator<Item = StepId> + '_ {
        self.next_step_id
            .iter()
            .chain(self.decision_yes_next_step_id.iter())
            .chain(self.decision_no_next_step_id.iter())
            .chain(self.parallel_steps.iter())
            .copied()
    }

    /// Un paso de decisión sin sucesor sí/no es terminal.
    pub fn is_terminal(&self) -> bool {
        if self.requires_decision {
            self.decision_yes_next_step_id.is_none() && self.decision_no_next_step_id.is_none()
        } else {
            self.next_step_id.is_none() && self.parallel_steps.is_empty()
        }
    }
}
