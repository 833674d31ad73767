use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{CompleteStep, ReopenStep, TransitionOutcome};
use crate::errors::{classify_error, EngineError, ErrorClass, FieldViolation};
use crate::model::{DossierId, StepId, UserId};
use crate::progress::ProgressRow;

pub const BAD_REQUEST: &str = "BadRequestError";
pub const UNKNOWN_USER: &str = "UnknownUserError";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteStepCall {
    pub dossier_id: DossierId,
    pub step_id: StepId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
}

impl CompleteStepCall {
    pub fn new(user_id: UserId, req: CompleteStep) -> Self {
        Self { dossier_id: req.dossier_id,
               step_id: req.step_id,
               user_id,
               decision: req.decision,
               notes: req.notes,
               form_data: req.form_data }
    }

    pub fn to_request(&self) -> CompleteStep {
        CompleteStep { dossier_id: self.dossier_id,
                       step_id: self.step_id,
                       decision: self.decision,
                       notes: self.notes.clone(),
                       form_data: self.form_data.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenStepCall {
    pub dossier_id: DossierId,
    pub step_id: StepId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReopenStepCall {
    pub fn new(user_id: UserId, req: ReopenStep) -> Self {
        Self { dossier_id: req.dossier_id,
               step_id: req.step_id,
               user_id,
               reason: req.reason }
    }

    pub fn to_request(&self) -> ReopenStep {
        ReopenStep { dossier_id: self.dossier_id,
                     step_id: self.step_id,
                     reason: self.reason.clone() }
    }
}

/// Cuerpo de la petición remota, discriminado por `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransitionRequest {
    CompleteStep(CompleteStepCall),
    ReopenStep(ReopenStepCall),
}

impl TransitionRequest {
    pub fn action(&self) -> &'static str {
        match self {
            TransitionRequest::CompleteStep(_) => "complete_step",
            TransitionRequest::ReopenStep(_) => "reopen_step",
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            TransitionRequest::CompleteStep(c) => c.user_id,
            TransitionRequest::ReopenStep(c) => c.user_id,
        }
    }

    pub fn dossier_id(&self) -> DossierId {
        match self {
            TransitionRequest::CompleteStep(c) => c.dossier_id,
            TransitionRequest::ReopenStep(c) => c.dossier_id,
        }
    }

    pub fn step_id(&self) -> StepId {
        match self {
            TransitionRequest::CompleteStep(c) => c.step_id,
            TransitionRequest::ReopenStep(c) => c.step_id,
        }
    }
}

/// Error tal como viaja en la respuesta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_fields: Option<Vec<FieldViolation>>,
}

impl RemoteError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(),
               message: message.into(),
               missing_fields: None,
               invalid_fields: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(BAD_REQUEST, message)
    }

    pub fn unknown_user(user_id: UserId) -> Self {
        Self::new(UNKNOWN_USER, format!("user {user_id} is not known"))
    }

    pub fn class(&self) -> ErrorClass {
        classify_kind(&self.kind)
    }
}

impl From<&EngineError> for RemoteError {
    fn from(err: &EngineError) -> Self {
        let mut remote = RemoteError::new(err.kind(), err.to_string());
        if let EngineError::Validation { missing, invalid } = err {
            remote.missing_fields = Some(missing.clone());
            remote.invalid_fields = Some(invalid.clone());
        }
        remote
    }
}

impl From<EngineError> for RemoteError {
    fn from(err: EngineError) -> Self {
        RemoteError::from(&err)
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Clasificación a partir del nombre de error remoto. Los nombres
/// desconocidos se tratan como fallo de transporte.
pub fn classify_kind(kind: &str) -> ErrorClass {
    match kind {
        "DecisionRequiredError" | "InvalidDecisionError" | "ValidationError" | "InvalidTemplateError" | BAD_REQUEST => {
            ErrorClass::Validation
        }
        "AlreadyCompletedError"
        | "StepNotActiveError"
        | "AlreadyInitializedError"
        | "NotReopenableError"
        | "InvalidTransitionError" => ErrorClass::Conflict,
        "StepNotFoundError" | "ProgressNotFoundError" | "DossierNotFoundError" | "NoActiveTemplateError" => {
            ErrorClass::NotFound
        }
        "ForbiddenError" | UNKNOWN_USER => ErrorClass::Forbidden,
        _ => ErrorClass::Transport,
    }
}

/// `{ok: true, progress, activated}` o `{ok: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Vec<ProgressRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated: Option<Vec<StepId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl TransitionResponse {
    pub fn success(outcome: TransitionOutcome) -> Self {
        Self { ok: true,
               progress: Some(outcome.progress),
               activated: Some(outcome.activated),
               error: None }
    }

    pub fn failure(error: RemoteError) -> Self {
        Self { ok: false,
               progress: None,
               activated: None,
               error: Some(error) }
    }

    pub fn into_result(self) -> Result<(Vec<ProgressRow>, Vec<StepId>), RemoteError> {
        match (self.ok, self.error) {
            (true, _) => Ok((self.progress.unwrap_or_default(), self.activated.unwrap_or_default())),
            (false, Some(err)) => Err(err),
            (false, None) => Err(RemoteError::new("InternalError", "failure response without error")),
        }
    }
}
