//! dossier-core: grafo de workflow por mundo, progreso por dossier, motor de
//! transiciones y compositor de línea de tiempo.
//!
//! El crate es síncrono y no depende de ningún backend concreto: el progreso
//! se guarda detrás de [`ProgressStore`], las plantillas detrás de
//! [`TemplateCatalog`] y los eventos laterales detrás de
//! [`SideEventSource`]. Las implementaciones en memoria sirven para tests y
//! para la demo; las de Postgres viven en `dossier-persistence`.
pub mod audit;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod form;
pub mod hashing;
pub mod model;
pub mod progress;
pub mod rpc;
pub mod template;
pub mod timeline;

pub use audit::{AuditEntry, AuditKind};
pub use engine::{CompleteStep, ProgressSummary, ReopenStep, StatusOverride, TransitionEngine, TransitionOutcome};
pub use errors::{classify_error, EngineError, ErrorClass, FieldViolation};
pub use form::{FieldKind, FormField};
pub use model::{ActingUser, DossierId, Role, StepId, UserId, WorldId};
pub use progress::{InMemoryProgressStore, ProgressPatch, ProgressRow, ProgressStore, ProgressTx, StepStatus};
pub use rpc::{ActorDirectory, InMemoryActorDirectory, RemoteError, TransitionRequest, TransitionResponse, TransitionService};
pub use template::{resolve_successors, Edge, EdgeKind, InMemoryTemplateCatalog, StepType, TemplateCatalog, WorkflowStep,
                   WorkflowTemplate};
pub use timeline::{compose_timeline, InMemorySideEventSource, Lane, SideEvent, SideEventKind, SideEventSource, Timeline,
                   TimelineGroup};
