use std::sync::Arc;

use dossier_core::{ActingUser, EngineError, InMemoryProgressStore, InMemoryTemplateCatalog, Role, TransitionEngine};
use dossierflow::demo_template;
use uuid::Uuid;

#[test]
fn each_world_uses_its_own_template_and_access() {
    let (world_a, world_b) = (Uuid::new_v4(), Uuid::new_v4());
    let catalog = InMemoryTemplateCatalog::new();
    let template_a = demo_template(world_a).unwrap();
    let template_b = demo_template(world_b).unwrap();
    catalog.register_template(template_a.clone()).unwrap();
    catalog.register_template(template_b.clone()).unwrap();
    let (dossier_a, dossier_b) = (Uuid::new_v4(), Uuid::new_v4());
    catalog.register_dossier(dossier_a, world_a).unwrap();
    catalog.register_dossier(dossier_b, world_b).unwrap();

    let engine = Arc::new(TransitionEngine::new(InMemoryProgressStore::new(), catalog));
    let agent_a = ActingUser::new(Uuid::new_v4(), vec![Role::Agent], vec![world_a]);
    let admin = ActingUser::new(Uuid::new_v4(), vec![Role::Admin], vec![]);

    let rows_a = engine.initialize_dossier(&agent_a, dossier_a).unwrap();
    assert!(rows_a.iter().all(|r| template_a.contains(r.workflow_step_id)));

    assert!(matches!(engine.initialize_dossier(&agent_a, dossier_b), Err(EngineError::Forbidden(_))));
    let rows_b = engine.initialize_dossier(&admin, dossier_b).unwrap();
    assert!(rows_b.iter().all(|r| template_b.contains(r.workflow_step_id)));
    assert!(matches!(engine.progress(&agent_a, dossier_b), Err(EngineError::Forbidden(_))));
}
