//! Contrato remoto del motor: peticiones `complete_step` / `reopen_step` en
//! JSON camelCase y el despachador que las ejecuta.

mod service;
mod wire;

pub use service::{ActorDirectory, InMemoryActorDirectory, TransitionService};
pub use wire::{classify_kind, CompleteStepCall, ReopenStepCall, RemoteError, TransitionRequest, TransitionResponse};
