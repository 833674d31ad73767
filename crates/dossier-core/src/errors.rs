//! Errores del motor de transiciones.
//!
//! Cada variante corresponde a un rechazo tipado que el endpoint remoto expone
//! tal cual (ver `kind()`); las capas superiores sólo clasifican
//! (`classify_error`) y refrescan, nunca resuelven conflictos localmente.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::progress::StepStatus;

/// Campo de formulario con valor inválido (presente pero no conforme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum EngineError {
    #[error("step {step_id} not found")]
    StepNotFound { step_id: Uuid },
    #[error("no progress row for step {step_id} in dossier {dossier_id}")]
    ProgressNotFound { dossier_id: Uuid, step_id: Uuid },
    #[error("progress row {progress_id} not found")]
    ProgressRowNotFound { progress_id: Uuid },
    #[error("step {step_id} already completed")]
    AlreadyCompleted { step_id: Uuid },
    #[error("step {step_id} is {status}, transition not allowed")]
    StepNotActive { step_id: Uuid, status: StepStatus },
    #[error("step {step_id} requires a yes/no decision")]
    DecisionRequired { step_id: Uuid },
    #[error("decision step {step_id} resolved without a decision")]
    InvalidDecision { step_id: Uuid },
    #[error("form validation failed (missing: {missing:?}, invalid: {invalid:?})")]
    Validation { missing: Vec<String>, invalid: Vec<FieldViolation> },
    #[error("progress already initialized for dossier {dossier_id}")]
    AlreadyInitialized { dossier_id: Uuid },
    #[error("dossier {dossier_id} not found")]
    DossierNotFound { dossier_id: Uuid },
    #[error("no active workflow template for world {world_id}")]
    NoActiveTemplate { world_id: Uuid },
    #[error("step {step_id} cannot be reopened: {reason}")]
    NotReopenable { step_id: Uuid, reason: String },
    #[error("invalid status transition for step {step_id}: {from} -> {to}")]
    InvalidTransition { step_id: Uuid, from: StepStatus, to: StepStatus },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid template: {0}")]
    InvalidTemplate(String),
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Clasificación gruesa usada por la UI para decidir cómo presentar el fallo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Se reporta inline, no hubo mutación.
    Validation,
    /// Aviso + refetch; nunca se reintenta automáticamente.
    Conflict,
    /// Referencia obsoleta: se refresca la vista desde la fuente.
    NotFound,
    Forbidden,
    /// Fallo genérico de transporte o almacenamiento.
    Transport,
}

pub fn classify_error(err: &EngineError) -> ErrorClass {
    use EngineError::*;
    match err {
        DecisionRequired { .. } | InvalidDecision { .. } | Validation { .. } | InvalidTemplate(_) => ErrorClass::Validation,
        AlreadyCompleted { .. }
        | StepNotActive { .. }
        | AlreadyInitialized { .. }
        | NotReopenable { .. }
        | InvalidTransition { .. } => ErrorClass::Conflict,
        StepNotFound { .. }
        | ProgressNotFound { .. }
        | ProgressRowNotFound { .. }
        | DossierNotFound { .. }
        | NoActiveTemplate { .. } => ErrorClass::NotFound,
        Forbidden(_) => ErrorClass::Forbidden,
        StorageError(_) | Internal(_) => ErrorClass::Transport,
    }
}

impl EngineError {
    /// Nombre estable del error en el contrato remoto.
    pub fn kind(&self) -> &'static str {
        use EngineError::*;
        match self {
            StepNotFound { .. } => "StepNotFoundError",
            ProgressNotFound { .. } | ProgressRowNotFound { .. } => "ProgressNotFoundError",
            AlreadyCompleted { .. } => "AlreadyCompletedError",
            StepNotActive { .. } => "StepNotActiveError",
            DecisionRequired { .. } => "DecisionRequiredError",
            InvalidDecision { .. } => "InvalidDecisionError",
            Validation { .. } => "ValidationError",
            AlreadyInitialized { .. } => "AlreadyInitializedError",
            DossierNotFound { .. } => "DossierNotFoundError",
            NoActiveTemplate { .. } => "NoActiveTemplateError",
            NotReopenable { .. } => "NotReopenableError",
            InvalidTransition { .. } => "InvalidTransitionError",
            Forbidden(_) => "ForbiddenError",
            InvalidTemplate(_) => "InvalidTemplateError",
            StorageError(_) => "StorageError",
            Internal(_) => "InternalError",
        }
    }
}
