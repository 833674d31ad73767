//! Compositor de línea de tiempo: intercala eventos laterales (comentarios,
//! documentos, tareas, citas, anotaciones) entre los pasos del workflow.

mod compositor;
mod source;
mod types;

pub use compositor::compose_timeline;
pub use source::{InMemorySideEventSource, SideEventSource};
pub use types::{Lane, SideEvent, SideEventKind, Timeline, TimelineGroup};
