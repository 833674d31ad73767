use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::{RemoteError, TransitionRequest, TransitionResponse};
use crate::engine::{TransitionEngine, TransitionOutcome};
use crate::errors::EngineError;
use crate::model::{ActingUser, DossierId, UserId};
use crate::progress::{ProgressRow, ProgressStore};
use crate::template::TemplateCatalog;
use crate::timeline::{SideEventSource, Timeline};

/// Resuelve el `userId` de la petición al usuario con sus roles y mundos.
pub trait ActorDirectory {
    fn resolve(&self, user_id: UserId) -> Result<Option<ActingUser>, EngineError>;
}

#[derive(Default)]
pub struct InMemoryActorDirectory {
    users: RwLock<HashMap<UserId, ActingUser>>,
}

impl InMemoryActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: ActingUser) -> Result<(), EngineError> {
        self.users
            .write()
            .map_err(|_| EngineError::Internal("actor directory lock poisoned".into()))?
            .insert(user.id, user);
        Ok(())
    }
}

impl ActorDirectory for InMemoryActorDirectory {
    fn resolve(&self, user_id: UserId) -> Result<Option<ActingUser>, EngineError> {
        let users = self.users
                        .read()
                        .map_err(|_| EngineError::Internal("actor directory lock poisoned".into()))?;
        Ok(users.get(&user_id).cloned())
    }
}

/// Endpoint del motor: decodifica la petición, resuelve el usuario, ejecuta
/// la transición y codifica la respuesta. Nunca entra en pánico por una
/// entrada malformada.
pub struct TransitionService<S, C>
    where S: ProgressStore,
          C: TemplateCatalog
{
    engine: Arc<TransitionEngine<S, C>>,
    directory: Arc<dyn ActorDirectory + Send + Sync>,
    events: Arc<dyn SideEventSource + Send + Sync>,
}

impl<S, C> TransitionService<S, C>
    where S: ProgressStore,
          C: TemplateCatalog
{
    pub fn new(engine: Arc<TransitionEngine<S, C>>,
               directory: Arc<dyn ActorDirectory + Send + Sync>,
               events: Arc<dyn SideEventSource + Send + Sync>)
               -> Self {
        Self { engine, directory, events }
    }

    pub fn engine(&self) -> &TransitionEngine<S, C> {
        &self.engine
    }

    fn actor(&self, user_id: UserId) -> Result<ActingUser, RemoteError> {
        self.directory
            .resolve(user_id)?
            .ok_or_else(|| RemoteError::unknown_user(user_id))
    }

    /// Punto de entrada JSON.
    pub fn handle_json(&self, body: &str) -> String {
        let response = match serde_json::from_str::<TransitionRequest>(body) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("malformed transition request: {e}");
                TransitionResponse::failure(RemoteError::bad_request(format!("malformed request: {e}")))
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
                                            warn!("response serialization failed: {e}");
                                            r#"{"ok":false,"error":{"kind":"InternalError","message":"response serialization failed"}}"#
                                                .to_string()
                                        })
    }

    pub fn handle(&self, request: TransitionRequest) -> TransitionResponse {
        debug!("{} request dossier={} step={}", request.action(), request.dossier_id(), request.step_id());
        match self.dispatch(&request) {
            Ok(outcome) => TransitionResponse::success(outcome),
            Err(e) => TransitionResponse::failure(e),
        }
    }

    fn dispatch(&self, request: &TransitionRequest) -> Result<TransitionOutcome, RemoteError> {
        let actor = self.actor(request.user_id())?;
        let outcome = match request {
            TransitionRequest::CompleteStep(call) => self.engine.complete_step(&actor, &call.to_request())?,
            TransitionRequest::ReopenStep(call) => self.engine.reopen_step(&actor, &call.to_request())?,
        };
        Ok(outcome)
    }

    /// Lectura de progreso a nombre de `user_id`.
    pub fn fetch_progress(&self, user_id: UserId, dossier_id: DossierId) -> Result<Vec<ProgressRow>, RemoteError> {
        let actor = self.actor(user_id)?;
        Ok(self.engine.progress(&actor, dossier_id)?)
    }

    pub fn fetch_timeline(&self,
                          user_id: UserId,
                          dossier_id: DossierId,
                          now: DateTime<Utc>)
                          -> Result<Timeline, RemoteError> {
        let actor = self.actor(user_id)?;
        Ok(self.engine.timeline(&actor, dossier_id, &*self.events, now)?)
    }
}
