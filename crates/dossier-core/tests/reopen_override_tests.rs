mod test_support;

use dossier_core::{AuditKind, CompleteStep, EngineError, ReopenStep, StatusOverride, StepStatus, WorkflowStep};
use test_support::Harness;

/// Collect(loop-back) -> Check -> Sign
fn loop_flow(tid: uuid::Uuid) -> Vec<WorkflowStep> {
    let sign = WorkflowStep::new(tid, 3, "Sign");
    let check = WorkflowStep::new(tid, 2, "Check").then(sign.id);
    let collect = WorkflowStep::new(tid, 1, "Collect").then(check.id).loop_back();
    vec![collect, check, sign]
}

fn reopen(h: &Harness, name: &str) -> ReopenStep {
    ReopenStep { dossier_id: h.dossier, step_id: h.step(name), reason: Some("incomplete file".into()) }
}

#[test]
fn reopened_step_can_be_completed_again_without_resetting_successors() {
    let h = Harness::new(loop_flow);
    h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, h.step("Collect")).with_notes("v1")).unwrap();

    let out = h.engine.reopen_step(&h.agent, &reopen(&h, "Collect")).unwrap();
    assert_eq!(out.step.status, StepStatus::InProgress);
    assert!(out.step.completed_at.is_none());
    assert_eq!(out.audit.kind,
               AuditKind::StepReopened { step_name: "Collect".into(), reason: Some("incomplete file".into()) });
    let check = out.progress.iter().find(|r| r.workflow_step_id == h.step("Check")).unwrap();
    assert_eq!(check.status, StepStatus::InProgress);

    // Completar de nuevo no reactiva Check (ya en curso).
    let out = h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, h.step("Collect"))).unwrap();
    assert!(out.activated.is_empty());
}

#[test]
fn reopen_is_refused_before_the_flow_moved_on_or_for_viewers() {
    let h = Harness::new(loop_flow);
    assert!(matches!(h.engine.reopen_step(&h.agent, &reopen(&h, "Collect")),
                     Err(EngineError::StepNotActive { status: StepStatus::InProgress, .. })));
    h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, h.step("Collect"))).unwrap();
    assert!(matches!(h.engine.reopen_step(&h.viewer, &reopen(&h, "Collect")), Err(EngineError::Forbidden(_))));
    h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, h.step("Check"))).unwrap();
    assert!(matches!(h.engine.reopen_step(&h.agent, &reopen(&h, "Check")), Err(EngineError::NotReopenable { .. })));
}

#[test]
fn blocked_step_cannot_be_completed_until_unblocked() {
    let h = Harness::new(loop_flow);
    let collect = h.step("Collect");
    h.engine.override_status(&h.manager, h.dossier, collect, StatusOverride::Block).unwrap();
    assert_eq!(h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, collect)),
               Err(EngineError::StepNotActive { step_id: collect, status: StepStatus::Blocked }));

    let out = h.engine.override_status(&h.manager, h.dossier, collect, StatusOverride::Unblock).unwrap();
    // Ya había arrancado: vuelve a in_progress.
    assert_eq!(out.step.status, StepStatus::InProgress);
    h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, collect)).unwrap();
}

#[test]
fn completed_steps_cannot_be_overridden() {
    let h = Harness::new(loop_flow);
    let collect = h.step("Collect");
    h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, collect)).unwrap();
    for op in [StatusOverride::Block, StatusOverride::Skip, StatusOverride::Unblock] {
        assert!(matches!(h.engine.override_status(&h.manager, h.dossier, collect, op),
                         Err(EngineError::InvalidTransition { from: StepStatus::Completed, .. })));
    }
}

#[test]
fn skipping_a_pending_step_keeps_the_flow_moving() {
    let h = Harness::new(loop_flow);
    let out = h.engine.override_status(&h.manager, h.dossier, h.step("Check"), StatusOverride::Skip).unwrap();
    assert_eq!(out.activated, vec![h.step("Sign")]);
    let summary = h.engine.summary(&h.agent, h.dossier).unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.in_progress, 2);
}
