//! Modelo del grafo de pasos de una plantilla de workflow.
//!
//! Una `WorkflowTemplate` pertenece a un mundo (tenant) y contiene sus pasos en
//! orden de `step_number`. Los punteros sucesores forman un grafo dirigido
//! (posiblemente cíclico vía `can_loop_back`); el modelo no detecta ciclos: un
//! paso completado nunca se re-entra automáticamente.

mod catalog;
mod graph;
mod step;
mod types;

pub use catalog::{InMemoryTemplateCatalog, TemplateCatalog};
pub use graph::{resolve_successors, Edge, EdgeKind};
pub use step::{StepType, WorkflowStep};
pub use types::WorkflowTemplate;
