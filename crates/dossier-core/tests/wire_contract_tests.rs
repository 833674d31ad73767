mod test_support;

use std::sync::Arc;

use dossier_core::{InMemoryActorDirectory, InMemorySideEventSource, InMemoryProgressStore, InMemoryTemplateCatalog,
                   TransitionRequest, TransitionResponse, TransitionService};
use serde_json::{json, Value};
use test_support::{decision, Harness};

fn service(h: Harness) -> (TransitionService<InMemoryProgressStore, InMemoryTemplateCatalog>, Harness) {
    let directory = InMemoryActorDirectory::new();
    directory.insert(h.agent.clone()).unwrap();
    directory.insert(h.viewer.clone()).unwrap();
    let svc = TransitionService::new(Arc::clone(&h.engine),
                                     Arc::new(directory),
                                     Arc::new(InMemorySideEventSource::new()));
    (svc, h)
}

fn call(svc: &TransitionService<InMemoryProgressStore, InMemoryTemplateCatalog>, body: Value) -> Value {
    serde_json::from_str(&svc.handle_json(&body.to_string())).unwrap()
}

#[test]
fn decision_required_error_kind_over_the_wire() {
    let (svc, h) = service(Harness::new(decision));
    let v = call(&svc, json!({"action": "complete_step", "dossierId": h.dossier, "stepId": h.step("Review"), "userId": h.agent.id}));
    assert_eq!(v, json!({"ok": false, "error": {"kind": "DecisionRequiredError",
                                                 "message": format!("step {} requires a yes/no decision", h.step("Review"))}}));

    let v = call(&svc,
                 json!({"action": "complete_step", "dossierId": h.dossier, "stepId": h.step("Review"), "userId": h.agent.id,
                        "decision": false, "notes": "incomplete"}));
    let response: TransitionResponse = serde_json::from_value(v).unwrap();
    let (progress, activated) = response.into_result().unwrap();
    assert_eq!(activated, vec![h.step("Reject")]);
    assert_eq!(progress[0].decision_taken, Some(false));
}

#[test]
fn viewer_gets_forbidden_and_reads_go_through_service() {
    let (svc, h) = service(Harness::new(decision));
    let v = call(&svc,
                 json!({"action": "complete_step", "dossierId": h.dossier, "stepId": h.step("Review"), "userId": h.viewer.id,
                        "decision": true}));
    assert_eq!(v["error"]["kind"], json!("ForbiddenError"));
    let rows = svc.fetch_progress(h.viewer.id, h.dossier).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(svc.fetch_progress(uuid::Uuid::new_v4(), h.dossier).is_err());
}

#[test]
fn reopen_request_shape() {
    let (svc, h) = service(Harness::new(decision));
    let body = json!({"action": "reopen_step", "dossierId": h.dossier, "stepId": h.step("Review"), "userId": h.agent.id,
                      "reason": "typo"});
    let req: TransitionRequest = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(req.action(), "reopen_step");
    let v = call(&svc, body);
    // Review no admite loop-back.
    assert_eq!(v["error"]["kind"], json!("NotReopenableError"));
}
