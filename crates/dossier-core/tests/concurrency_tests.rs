mod test_support;

use std::sync::{Arc, Barrier};
use std::thread;

use dossier_core::{AuditKind, CompleteStep, EngineError, ProgressStore, StepStatus};
use test_support::{linear, parallel, Harness};

#[test]
fn duplicate_submission_has_exactly_one_winner() {
    for _ in 0..20 {
        let h = Arc::new(Harness::new(linear));
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2).map(|_| {
                                        let h = Arc::clone(&h);
                                        let barrier = Arc::clone(&barrier);
                                        thread::spawn(move || {
                                            barrier.wait();
                                            h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, h.step("Step1")))
                                        })
                                    })
                                    .collect();
        let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1, "exactly one submission must win: {results:?}");
        let err = results.into_iter().find_map(|r| r.err()).unwrap();
        assert_eq!(err, EngineError::AlreadyCompleted { step_id: h.step("Step1") });

        let completions = h.engine
                           .store()
                           .audit_log(h.dossier)
                           .unwrap()
                           .into_iter()
                           .filter(|e| matches!(e.kind, AuditKind::StepCompleted { .. }))
                           .count();
        assert_eq!(completions, 1);
    }
}

#[test]
fn repeated_completion_is_a_hard_error_and_leaves_row_unchanged() {
    let h = Harness::new(linear);
    let req = CompleteStep::new(h.dossier, h.step("Step1")).with_notes("first");
    let first = h.engine.complete_step(&h.agent, &req).unwrap();
    let again = CompleteStep::new(h.dossier, h.step("Step1")).with_notes("second");
    assert_eq!(h.engine.complete_step(&h.manager, &again),
               Err(EngineError::AlreadyCompleted { step_id: h.step("Step1") }));
    let rows = h.engine.progress(&h.agent, h.dossier).unwrap();
    assert_eq!(rows[0], first.step);
    assert_eq!(rows[0].notes.as_deref(), Some("first"));
}

#[test]
fn completed_rows_never_regress_through_completion() {
    // Recorre todas las transiciones posibles y comprueba que ninguna fila
    // completada vuelve atrás y que sólo los pendientes pasan a in_progress.
    let h = Harness::new(parallel);
    let mut before = h.engine.progress(&h.agent, h.dossier).unwrap();
    for name in ["Open", "Visit", "Docs", "Close", "Open", "Docs"] {
        let res = h.engine.complete_step(&h.agent, &CompleteStep::new(h.dossier, h.step(name)));
        let after = h.engine.progress(&h.agent, h.dossier).unwrap();
        for (b, a) in before.iter().zip(after.iter()) {
            if b.status == StepStatus::Completed {
                assert_eq!(a, b);
            }
            if a.status == StepStatus::InProgress && b.status != StepStatus::InProgress {
                assert_eq!(b.status, StepStatus::Pending);
            }
        }
        if let Ok(out) = res {
            for id in &out.activated {
                let prev = before.iter().find(|r| r.workflow_step_id == *id).unwrap();
                assert_eq!(prev.status, StepStatus::Pending);
            }
        }
        before = after;
    }
    assert!(before.iter().all(|r| r.status == StepStatus::Completed));
}

#[test]
fn different_dossiers_progress_independently() {
    let a = Arc::new(Harness::new(linear));
    let b = Arc::new(Harness::new(linear));
    let ta = {
        let a = Arc::clone(&a);
        thread::spawn(move || a.engine.complete_step(&a.agent, &CompleteStep::new(a.dossier, a.step("Step1"))))
    };
    let tb = {
        let b = Arc::clone(&b);
        thread::spawn(move || b.engine.complete_step(&b.agent, &CompleteStep::new(b.dossier, b.step("Step1"))))
    };
    assert!(ta.join().unwrap().is_ok());
    assert!(tb.join().unwrap().is_ok());
}
