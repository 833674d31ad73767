//! Ensamblado del servicio de transiciones sobre cada backend y la demo de
//! dossier que usa `main`.

use std::sync::Arc;

use chrono::Utc;
use log::info;
use uuid::Uuid;

use dossier_client::{InProcessClient, OptimisticSession};
use dossier_core::rpc::CompleteStepCall;
use dossier_core::{ActingUser, DossierId, EngineError, FieldKind, FormField, InMemoryActorDirectory,
                   InMemoryProgressStore, InMemorySideEventSource, InMemoryTemplateCatalog, ProgressStore,
                   ProgressSummary, Role, SideEvent, SideEventKind, StepId, TemplateCatalog, TransitionEngine,
                   TransitionService, WorkflowStep, WorkflowTemplate, WorldId};
use dossier_persistence::{PgPool, PgProgressStore, PgSideEventSource, PgTemplateCatalog, PoolProvider};

use crate::errors::AppError;

pub type MemoryService = TransitionService<InMemoryProgressStore, InMemoryTemplateCatalog>;
pub type PgService = TransitionService<PgProgressStore<PoolProvider>, PgTemplateCatalog<PoolProvider>>;

/// Plantilla de ejemplo:
///
/// ```text
/// Intake(form) -> Review(decisión) --sí--> Visit -> Close
///                    |                       \-> Documents (paralelo)
///                    \--no--> Intake
/// ```
pub fn demo_template(world_id: WorldId) -> Result<WorkflowTemplate, EngineError> {
    let tid = Uuid::new_v4();
    let close = WorkflowStep::new(tid, 5, "Close");
    let documents = WorkflowStep::new(tid, 4, "Documents");
    let visit = WorkflowStep::new(tid, 3, "Visit").then(close.id).parallel(vec![documents.id]);
    let intake = WorkflowStep::new(tid, 1, "Intake");
    let review = WorkflowStep::new(tid, 2, "Review").decision(Some(visit.id), Some(intake.id));
    let reference = FormField::new("reference",
                                   true,
                                   FieldKind::Text { min_length: Some(3),
                                                     max_length: None,
                                                     pattern: None });
    let intake = intake.then(review.id).loop_back().with_form(vec![reference]);
    WorkflowTemplate::new(tid, world_id, "Dossier standard", true, vec![intake, review, visit, documents, close])
}

/// Mundo, plantilla, dossier y usuarios de la demo.
pub struct DemoDossier {
    pub world: WorldId,
    pub dossier: DossierId,
    pub template: WorkflowTemplate,
    pub agent: ActingUser,
    pub manager: ActingUser,
}

impl DemoDossier {
    pub fn new() -> Result<Self, EngineError> {
        let world = Uuid::new_v4();
        Ok(Self { world,
                  dossier: Uuid::new_v4(),
                  template: demo_template(world)?,
                  agent: ActingUser::new(Uuid::new_v4(), vec![Role::Agent], vec![world]),
                  manager: ActingUser::new(Uuid::new_v4(), vec![Role::Manager], vec![world]) })
    }

    pub fn step(&self, name: &str) -> Result<StepId, EngineError> {
        self.template
            .ordered_steps()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| EngineError::Internal(format!("demo step {name} missing")))
    }

    fn directory(&self) -> Result<InMemoryActorDirectory, EngineError> {
        let directory = InMemoryActorDirectory::new();
        directory.insert(self.agent.clone())?;
        directory.insert(self.manager.clone())?;
        Ok(directory)
    }
}

/// Servicio en memoria con el dossier de la demo ya inicializado.
pub fn build_memory_service(demo: &DemoDossier,
                            events: Arc<InMemorySideEventSource>)
                            -> Result<Arc<MemoryService>, AppError> {
    let catalog = InMemoryTemplateCatalog::new();
    catalog.register_template(demo.template.clone())?;
    catalog.register_dossier(demo.dossier, demo.world)?;
    let engine = Arc::new(TransitionEngine::new(InMemoryProgressStore::new(), catalog));
    engine.initialize_dossier(&demo.agent, demo.dossier)?;
    Ok(Arc::new(TransitionService::new(engine, Arc::new(demo.directory()?), events)))
}

/// Igual que [`build_memory_service`] pero sobre Postgres (pool ya migrado).
pub fn build_pg_service(pool: PgPool, demo: &DemoDossier) -> Result<Arc<PgService>, AppError> {
    let provider = PoolProvider::new(pool);
    let catalog = PgTemplateCatalog::new(provider.clone());
    catalog.insert_template(&demo.template)?;
    catalog.insert_dossier(demo.dossier, demo.world, "Demo dossier")?;
    let engine = Arc::new(TransitionEngine::new(PgProgressStore::new(provider.clone()), catalog));
    engine.initialize_dossier(&demo.agent, demo.dossier)?;
    Ok(Arc::new(TransitionService::new(engine,
                                       Arc::new(demo.directory()?),
                                       Arc::new(PgSideEventSource::new(provider)))))
}

/// Comentario manual para que la línea de tiempo tenga algo que agrupar.
pub fn record_demo_comment(events: &InMemorySideEventSource, demo: &DemoDossier) -> Result<(), EngineError> {
    let mut comment = SideEvent::new(SideEventKind::Comment, Utc::now(), "Client called back");
    comment.created_by = Some(demo.agent.id);
    events.record(demo.dossier, comment)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub summary: ProgressSummary,
    /// Error devuelto al intentar completar Intake sin formulario.
    pub rejected_kind: Option<String>,
    pub timeline_groups: usize,
    pub timeline_events: usize,
}

/// Recorre el dossier de la demo a través de una sesión optimista.
pub async fn run_demo<S, C>(service: Arc<TransitionService<S, C>>, demo: &DemoDossier) -> Result<DemoReport, AppError>
    where S: ProgressStore + Send + Sync + 'static,
          C: TemplateCatalog + Send + Sync + 'static
{
    let client = Arc::new(InProcessClient::new(Arc::clone(&service), demo.agent.id));
    let session = OptimisticSession::new(client, demo.dossier);
    session.load().await?;

    let intake = demo.step("Intake")?;
    let call = |step_id: StepId| CompleteStepCall { dossier_id: demo.dossier,
                                                    step_id,
                                                    user_id: demo.agent.id,
                                                    decision: None,
                                                    notes: None,
                                                    form_data: None };

    // Sin formulario: rechazo de validación, la vista vuelve al estado real.
    let rejected_kind = match session.complete_step(call(intake)).await {
        Ok(_) => None,
        Err(e) => {
            info!("intake rejected: {e}");
            session.view().await.notice.map(|n| n.kind)
        }
    };

    let mut with_form = call(intake);
    with_form.form_data = Some(serde_json::json!({ "reference": "DOS-2024-001" }));
    session.complete_step(with_form).await?;

    let mut review = call(demo.step("Review")?);
    review.decision = Some(true);
    review.notes = Some("Dossier complet".into());
    session.complete_step(review).await?;

    let activated = session.complete_step(call(demo.step("Visit")?)).await?;
    info!("visit completed, activated {} step(s)", activated.len());

    let view = session.view().await;
    let summary = service.engine().summary(&demo.agent, demo.dossier)?;
    Ok(DemoReport { summary,
                    rejected_kind,
                    timeline_groups: view.timeline.groups.len(),
                    timeline_events: view.timeline.event_count() })
}
