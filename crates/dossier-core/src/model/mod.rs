//! Identificadores y contexto del actor.

pub mod actor;

pub use actor::{ActingUser, Role};

pub type DossierId = uuid::Uuid;
pub type StepId = uuid::Uuid;
pub type UserId = uuid::Uuid;
pub type WorldId = uuid::Uuid;
