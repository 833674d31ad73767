#![allow(dead_code)]

use dossier_core::{ActingUser, DossierId, InMemoryProgressStore, InMemoryTemplateCatalog, Role, TransitionEngine,
                   WorkflowStep, WorkflowTemplate, WorldId};
use std::sync::Arc;
use uuid::Uuid;

pub type MemEngine = TransitionEngine<InMemoryProgressStore, InMemoryTemplateCatalog>;

pub struct Harness {
    pub engine: Arc<MemEngine>,
    pub world: WorldId,
    pub template_id: Uuid,
    pub dossier: DossierId,
    pub steps: Vec<WorkflowStep>,
    pub agent: ActingUser,
    pub manager: ActingUser,
    pub viewer: ActingUser,
}

impl Harness {
    /// Registra la plantilla que produce `build` y un dossier ya inicializado.
    pub fn new(build: impl FnOnce(Uuid) -> Vec<WorkflowStep>) -> Self {
        let world = Uuid::new_v4();
        let template_id = Uuid::new_v4();
        let steps = build(template_id);
        let template = WorkflowTemplate::new(template_id, world, "default", true, steps.clone()).unwrap();
        let catalog = InMemoryTemplateCatalog::new();
        catalog.register_template(template).unwrap();
        let dossier = Uuid::new_v4();
        catalog.register_dossier(dossier, world).unwrap();
        let agent = ActingUser::new(Uuid::new_v4(), vec![Role::Agent], vec![world]);
        let manager = ActingUser::new(Uuid::new_v4(), vec![Role::Manager], vec![world]);
        let viewer = ActingUser::new(Uuid::new_v4(), vec![Role::Viewer], vec![world]);
        let engine = Arc::new(TransitionEngine::new(InMemoryProgressStore::new(), catalog));
        engine.initialize_dossier(&agent, dossier).unwrap();
        Harness { engine,
                  world,
                  template_id,
                  dossier,
                  steps,
                  agent,
                  manager,
                  viewer }
    }

    /// Paso por nombre.
    pub fn step(&self, name: &str) -> Uuid {
        self.steps.iter().find(|s| s.name == name).map(|s| s.id).unwrap()
    }
}

/// Step1 -> Step2 -> Step3.
pub fn linear(tid: Uuid) -> Vec<WorkflowStep> {
    let s3 = WorkflowStep::new(tid, 3, "Step3");
    let s2 = WorkflowStep::new(tid, 2, "Step2").then(s3.id);
    let s1 = WorkflowStep::new(tid, 1, "Step1").then(s2.id);
    vec![s1, s2, s3]
}

/// Review (decisión) -> Approve | Reject.
pub fn decision(tid: Uuid) -> Vec<WorkflowStep> {
    let approve = WorkflowStep::new(tid, 2, "Approve");
    let reject = WorkflowStep::new(tid, 3, "Reject");
    let review = WorkflowStep::new(tid, 1, "Review").decision(Some(approve.id), Some(reject.id));
    vec![review, approve, reject]
}

/// Open -> {Docs, Visit} (paralelo) ; Docs -> Close.
pub fn parallel(tid: Uuid) -> Vec<WorkflowStep> {
    let close = WorkflowStep::new(tid, 4, "Close");
    let visit = WorkflowStep::new(tid, 3, "Visit");
    let docs = WorkflowStep::new(tid, 2, "Docs").then(close.id);
    let open = WorkflowStep::new(tid, 1, "Open").parallel(vec![docs.id, visit.id]);
    vec![open, docs, visit, close]
}
