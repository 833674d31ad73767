//! Sesión optimista sobre un dossier.
//!
//! Ciclo de una acción:
//! 1. marca tentativa local del paso (y `in_flight`);
//! 2. invocación remota;
//! 3. refetch incondicional de progreso y línea de tiempo, que reemplaza la
//!    vista entera (éxito o fallo);
//! 4. si el refetch falla se restaura la instantánea previa y la vista queda
//!    `stale`.
//!
//! Una acción cancelada a medio camino deja la vista como en el punto 4.
//!
//! Los conflictos no se reintentan: se muestran como aviso y la vista queda
//! con el estado del servidor.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::RwLock;

use dossier_core::rpc::{CompleteStepCall, ReopenStepCall, TransitionRequest};
use dossier_core::{DossierId, ErrorClass, ProgressRow, StepId, StepStatus, Timeline};

use crate::client::TransitionClient;
use crate::error::ClientError;

/// Aviso visible tras un fallo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub class: ErrorClass,
    pub kind: String,
    pub message: String,
    /// Campos a marcar inline cuando el fallo es de validación.
    pub missing_fields: Vec<String>,
}

impl From<&ClientError> for Notice {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Rejected(remote) => Notice { class: remote.class(),
                                                      kind: remote.kind.clone(),
                                                      message: remote.message.clone(),
                                                      missing_fields: remote.missing_fields.clone().unwrap_or_default() },
            other => Notice { class: other.class(),
                              kind: match other {
                                  ClientError::Busy => "Busy".to_string(),
                                  _ => "TransportError".to_string(),
                              },
                              message: other.to_string(),
                              missing_fields: Vec::new() },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DossierView {
    pub progress: Vec<ProgressRow>,
    pub timeline: Timeline,
    /// Paso con una acción pendiente de respuesta.
    pub in_flight: Option<StepId>,
    pub notice: Option<Notice>,
    /// La última recarga falló; lo mostrado puede no coincidir con el servidor.
    pub stale: bool,
}

impl DossierView {
    pub fn row(&self, step_id: StepId) -> Option<&ProgressRow> {
        self.progress.iter().find(|r| r.workflow_step_id == step_id)
    }

    pub fn status_of(&self, step_id: StepId) -> Option<StepStatus> {
        self.row(step_id).map(|r| r.status)
    }
}

pub struct OptimisticSession<C: TransitionClient> {
    client: Arc<C>,
    dossier_id: DossierId,
    view: Arc<RwLock<DossierView>>,
}

impl<C: TransitionClient> Clone for OptimisticSession<C> {
    fn clone(&self) -> Self {
        Self { client: Arc::clone(&self.client),
               dossier_id: self.dossier_id,
               view: Arc::clone(&self.view) }
    }
}

impl<C: TransitionClient> OptimisticSession<C> {
    pub fn new(client: Arc<C>, dossier_id: DossierId) -> Self {
        Self { client,
               dossier_id,
               view: Arc::new(RwLock::new(DossierView::default())) }
    }

    pub fn dossier_id(&self) -> DossierId {
        self.dossier_id
    }

    /// Copia del estado visible.
    pub async fn view(&self) -> DossierView {
        self.view.read().await.clone()
    }

    /// Carga inicial (o recarga manual) desde el servidor.
    pub async fn load(&self) -> Result<(), ClientError> {
        let (progress, timeline) = self.refetch().await?;
        let mut view = self.view.write().await;
        view.progress = progress;
        view.timeline = timeline;
        view.stale = false;
        Ok(())
    }

    /// Completa un paso con marca optimista. Devuelve los pasos activados.
    pub async fn complete_step(&self, call: CompleteStepCall) -> Result<Vec<StepId>, ClientError> {
        let decision = call.decision;
        let notes = call.notes.clone();
        let step_id = call.step_id;
        self.run(step_id, TransitionRequest::CompleteStep(call), move |row| {
                row.status = StepStatus::Completed;
                row.completed_at = Some(Utc::now());
                row.decision_taken = decision;
                row.notes = notes;
            })
            .await
    }

    pub async fn reopen_step(&self, call: ReopenStepCall) -> Result<Vec<StepId>, ClientError> {
        let step_id = call.step_id;
        self.run(step_id, TransitionRequest::ReopenStep(call), |row| {
                row.status = StepStatus::InProgress;
                row.completed_at = None;
                row.completed_by = None;
            })
            .await
    }

    async fn run(&self,
                 step_id: StepId,
                 request: TransitionRequest,
                 mark: impl FnOnce(&mut ProgressRow))
                 -> Result<Vec<StepId>, ClientError> {
        let mut pending = {
            let mut view = self.view.write().await;
            if view.in_flight.is_some() {
                return Err(ClientError::Busy);
            }
            let pending = PendingAction::new(Arc::clone(&self.view), &view);
            if let Some(row) = view.progress.iter_mut().find(|r| r.workflow_step_id == step_id) {
                mark(row);
            }
            view.in_flight = Some(step_id);
            view.notice = None;
            pending
        };

        debug!("{} on step {step_id} (dossier {})", request.action(), self.dossier_id);
        let outcome = match self.client.invoke(request).await {
            Ok(response) => response.into_result().map_err(ClientError::Rejected),
            Err(e) => Err(e),
        };
        let refreshed = self.refetch().await;

        let mut view = self.view.write().await;
        // Sin más `.await` a partir de aquí: la acción ya no puede cancelarse.
        let (snapshot_progress, snapshot_timeline) = pending.finish();
        view.in_flight = None;
        match refreshed {
            Ok((progress, timeline)) => {
                view.progress = progress;
                view.timeline = timeline;
                view.stale = false;
            }
            Err(e) => {
                warn!("refetch after action failed for dossier {}: {e}", self.dossier_id);
                view.progress = snapshot_progress;
                view.timeline = snapshot_timeline;
                view.stale = true;
            }
        }
        if let Err(e) = &outcome {
            view.notice = Some(Notice::from(e));
        }
        outcome.map(|(_, activated)| activated)
    }

    async fn refetch(&self) -> Result<(Vec<ProgressRow>, Timeline), ClientError> {
        let progress = self.client.fetch_progress(self.dossier_id).await?;
        let timeline = self.client.fetch_timeline(self.dossier_id).await?;
        Ok((progress, timeline))
    }
}

/// Instantánea previa a una acción en curso.
///
/// Si el futuro de la acción se descarta antes de terminar (timeout,
/// `select!`), `Drop` libera `in_flight`, restaura la instantánea y marca la
/// vista `stale`: no se sabe si la transición llegó al servidor.
struct PendingAction {
    view: Arc<RwLock<DossierView>>,
    snapshot: Option<(Vec<ProgressRow>, Timeline)>,
}

impl PendingAction {
    fn new(view: Arc<RwLock<DossierView>>, current: &DossierView) -> Self {
        Self { view,
               snapshot: Some((current.progress.clone(), current.timeline.clone())) }
    }

    /// Desarma la restauración y devuelve la instantánea.
    fn finish(&mut self) -> (Vec<ProgressRow>, Timeline) {
        self.snapshot.take().unwrap_or_default()
    }
}

fn abandon(view: &mut DossierView, (progress, timeline): (Vec<ProgressRow>, Timeline)) {
    view.in_flight = None;
    view.progress = progress;
    view.timeline = timeline;
    view.stale = true;
}

impl Drop for PendingAction {
    fn drop(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        warn!("action cancelled before completion, restoring local view");
        match self.view.try_write() {
            Ok(mut view) => abandon(&mut view, snapshot),
            Err(_) => {
                let view = Arc::clone(&self.view);
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move { abandon(&mut *view.write().await, snapshot) });
                    }
                    Err(_) => warn!("no runtime to release the cancelled action; session stays busy"),
                }
            }
        }
    }
}
