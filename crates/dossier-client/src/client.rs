use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;

use dossier_core::rpc::{TransitionRequest, TransitionResponse, TransitionService};
use dossier_core::{DossierId, ProgressRow, ProgressStore, TemplateCatalog, Timeline, UserId};

use crate::error::ClientError;

/// Acceso remoto al motor. `invoke` sólo falla con `Transport`: los rechazos
/// del motor viajan dentro de la respuesta.
#[async_trait]
pub trait TransitionClient: Send + Sync {
    async fn invoke(&self, request: TransitionRequest) -> Result<TransitionResponse, ClientError>;
    async fn fetch_progress(&self, dossier_id: DossierId) -> Result<Vec<ProgressRow>, ClientError>;
    async fn fetch_timeline(&self, dossier_id: DossierId) -> Result<Timeline, ClientError>;
}

/// Cliente que habla con un `TransitionService` del mismo proceso pasando por
/// el contrato JSON, como lo haría el endpoint remoto.
pub struct InProcessClient<S, C>
    where S: ProgressStore,
          C: TemplateCatalog
{
    service: Arc<TransitionService<S, C>>,
    user_id: UserId,
}

impl<S, C> InProcessClient<S, C>
    where S: ProgressStore,
          C: TemplateCatalog
{
    pub fn new(service: Arc<TransitionService<S, C>>, user_id: UserId) -> Self {
        Self { service, user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

fn join_error(e: tokio::task::JoinError) -> ClientError {
    ClientError::Transport(format!("worker failed: {e}"))
}

#[async_trait]
impl<S, C> TransitionClient for InProcessClient<S, C>
    where S: ProgressStore + Send + Sync + 'static,
          C: TemplateCatalog + Send + Sync + 'static
{
    async fn invoke(&self, request: TransitionRequest) -> Result<TransitionResponse, ClientError> {
        let body = serde_json::to_string(&request).map_err(|e| ClientError::Transport(format!("encode: {e}")))?;
        debug!("invoke {} for dossier {}", request.action(), request.dossier_id());
        let service = Arc::clone(&self.service);
        // El motor es síncrono (puede bloquear en la base de datos).
        let raw = tokio::task::spawn_blocking(move || service.handle_json(&body)).await
                                                                                 .map_err(join_error)?;
        serde_json::from_str(&raw).map_err(|e| ClientError::Transport(format!("decode: {e}")))
    }

    async fn fetch_progress(&self, dossier_id: DossierId) -> Result<Vec<ProgressRow>, ClientError> {
        let service = Arc::clone(&self.service);
        let user_id = self.user_id;
        let rows = tokio::task::spawn_blocking(move || service.fetch_progress(user_id, dossier_id)).await
                                                                                                  .map_err(join_error)??;
        Ok(rows)
    }

    async fn fetch_timeline(&self, dossier_id: DossierId) -> Result<Timeline, ClientError> {
        let service = Arc::clone(&self.service);
        let user_id = self.user_id;
        let timeline =
            tokio::task::spawn_blocking(move || service.fetch_timeline(user_id, dossier_id, Utc::now())).await
                                                                                                          .map_err(join_error)??;
        Ok(timeline)
    }
}
