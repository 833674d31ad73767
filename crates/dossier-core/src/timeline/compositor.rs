use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::{Lane, SideEvent, Timeline, TimelineGroup};
use crate::model::StepId;
use crate::progress::ProgressRow;
use crate::template::WorkflowStep;

/// Agrupa `events` en ventanas temporales ancladas a cada paso.
///
/// Ancla de un paso: `completed_at` si está completado, si no `started_at`, si
/// no `now` (pasos sin fecha quedan como los más recientes). Con los pasos en
/// orden cronológico ascendente por `(ancla, step_number)`, el evento E cae en
/// el primer paso S con `E.timestamp <= S.ancla`, es decir en
/// `(ancla anterior, S.ancla]`. El paso más antiguo absorbe todo lo anterior y
/// el más reciente todo lo posterior a su ancla, así cada evento aparece en
/// exactamente un grupo. La ubicación es una aproximación temporal, no causal.
///
/// Salida: grupos del más reciente al más antiguo; dentro de cada grupo, carril
/// A (documento/comentario/anotación) y carril B (tarea/cita), cada uno del
/// más reciente al más antiguo.
pub fn compose_timeline(steps: &[WorkflowStep],
                        progress: &[ProgressRow],
                        events: Vec<SideEvent>,
                        now: DateTime<Utc>)
                        -> Timeline {
    if steps.is_empty() {
        return Timeline::default();
    }

    let rows: HashMap<StepId, &ProgressRow> = progress.iter().map(|r| (r.workflow_step_id, r)).collect();

    let mut groups: Vec<TimelineGroup> =
        steps.iter()
             .map(|step| {
                 let row = rows.get(&step.id).copied();
                 let dated_anchor = row.and_then(ProgressRow::anchor);
                 TimelineGroup { step: step.clone(),
                                 progress: row.cloned(),
                                 anchor: dated_anchor.unwrap_or(now),
                                 dated: dated_anchor.is_some(),
                                 lane_a: Vec::new(),
                                 lane_b: Vec::new() }
             })
             .collect();
    // Orden estable: empates de ancla se resuelven por step_number.
    groups.sort_by(|a, b| a.anchor.cmp(&b.anchor).then(a.step.step_number.cmp(&b.step.step_number)));

    let anchors: Vec<DateTime<Utc>> = groups.iter().map(|g| g.anchor).collect();
    let last = groups.len() - 1;
    for event in events {
        let idx = anchors.partition_point(|a| *a < event.timestamp).min(last);
        let group = &mut groups[idx];
        match event.kind.lane() {
            Lane::A => group.lane_a.push(event),
            Lane::B => group.lane_b.push(event),
        }
    }

    for group in groups.iter_mut() {
        sort_by_recency(&mut group.lane_a);
        sort_by_recency(&mut group.lane_b);
    }
    groups.reverse();
    Timeline { groups }
}

fn sort_by_recency(events: &mut [SideEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressPatch;
    use crate::timeline::SideEventKind;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    /// 1 completado en t(10), 2 completado en t(30), 3 en curso desde t(40),
    /// 4 pendiente.
    fn fixture() -> (Vec<WorkflowStep>, Vec<ProgressRow>) {
        let tid = Uuid::new_v4();
        let s4 = WorkflowStep::new(tid, 4, "close");
        let s3 = WorkflowStep::new(tid, 3, "visit").then(s4.id);
        let s2 = WorkflowStep::new(tid, 2, "review").then(s3.id);
        let s1 = WorkflowStep::new(tid, 1, "intake").then(s2.id);
        let dossier = Uuid::new_v4();
        let user = Uuid::new_v4();
        let mut r1 = ProgressRow::new(dossier, s1.id);
        r1.apply(&ProgressPatch::activate(t(0)));
        r1.apply(&ProgressPatch::complete(t(10), user, None, None, None));
        let mut r2 = ProgressRow::new(dossier, s2.id);
        r2.apply(&ProgressPatch::activate(t(10)));
        r2.apply(&ProgressPatch::complete(t(30), user, None, None, None));
        let mut r3 = ProgressRow::new(dossier, s3.id);
        r3.apply(&ProgressPatch::activate(t(40)));
        let r4 = ProgressRow::new(dossier, s4.id);
        (vec![s1, s2, s3, s4], vec![r1, r2, r3, r4])
    }

    fn ev(kind: SideEventKind, minutes: i64) -> SideEvent {
        SideEvent::new(kind, t(minutes), format!("{kind:?}@{minutes}"))
    }

    #[test]
    fn groups_are_most_recent_first_with_undated_on_top() {
        let (steps, rows) = fixture();
        let timeline = compose_timeline(&steps, &rows, vec![], t(100));
        let names: Vec<&str> = timeline.groups.iter().map(|g| g.step.name.as_str()).collect();
        assert_eq!(names, vec!["close", "visit", "review", "intake"]);
        assert!(!timeline.groups[0].dated);
        assert_eq!(timeline.groups[0].anchor, t(100));
        assert_eq!(timeline.groups[1].anchor, t(40));
    }

    #[test]
    fn events_fall_into_half_open_windows() {
        let (steps, rows) = fixture();
        let events = vec![ev(SideEventKind::Comment, -5), // antes del primer paso -> intake
                          ev(SideEventKind::Document, 10), // límite superior inclusivo -> intake
                          ev(SideEventKind::Task, 11),     // -> review
                          ev(SideEventKind::Appointment, 30),
                          ev(SideEventKind::Annotation, 35), // -> visit
                          ev(SideEventKind::Comment, 90),    // -> close (centinela t(100))
                          ev(SideEventKind::Appointment, 500), // futuro -> close
        ];
        let timeline = compose_timeline(&steps, &rows, events, t(100));
        assert_eq!(timeline.event_count(), 7);

        let intake = timeline.group_for_step(steps[0].id).unwrap();
        assert_eq!(intake.lane_a.iter().map(|e| e.timestamp).collect::<Vec<_>>(), vec![t(10), t(-5)]);
        assert!(intake.lane_b.is_empty());

        let review = timeline.group_for_step(steps[1].id).unwrap();
        assert!(review.lane_a.is_empty());
        assert_eq!(review.lane_b.iter().map(|e| e.timestamp).collect::<Vec<_>>(), vec![t(30), t(11)]);

        let visit = timeline.group_for_step(steps[2].id).unwrap();
        assert_eq!(visit.lane_a.len(), 1);
        assert_eq!(visit.lane_a[0].kind, SideEventKind::Annotation);

        let close = timeline.group_for_step(steps[3].id).unwrap();
        assert_eq!(close.lane_a.len(), 1);
        assert_eq!(close.lane_b[0].timestamp, t(500));
    }

    #[test]
    fn every_event_lands_in_exactly_its_window() {
        let (steps, rows) = fixture();
        // Secuencia pseudoaleatoria determinista (LCG) sobre [-60, 200) minutos.
        let mut seed: u64 = 42;
        let kinds = [SideEventKind::Comment,
                     SideEventKind::Document,
                     SideEventKind::Task,
                     SideEventKind::Appointment,
                     SideEventKind::Annotation];
        let events: Vec<SideEvent> = (0..200).map(|i| {
                                                  seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                                                  let minutes = ((seed >> 33) % 260) as i64 - 60;
                                                  ev(kinds[i % kinds.len()], minutes)
                                              })
                                              .collect();
        let now = t(100);
        let timeline = compose_timeline(&steps, &rows, events.clone(), now);
        assert_eq!(timeline.event_count(), events.len());

        // groups: más reciente primero; la ventana de groups[i] es (groups[i+1].anchor, groups[i].anchor]
        let n = timeline.groups.len();
        for e in &events {
            let holders: Vec<usize> = (0..n).filter(|i| timeline.groups[*i].events().any(|x| x.id == e.id)).collect();
            assert_eq!(holders.len(), 1, "event {:?} must appear exactly once", e.timestamp);
            let i = holders[0];
            let g = &timeline.groups[i];
            if i > 0 {
                assert!(e.timestamp <= g.anchor);
            }
            if i + 1 < n {
                assert!(e.timestamp > timeline.groups[i + 1].anchor);
            }
        }
    }

    #[test]
    fn tied_anchors_break_by_step_number() {
        let tid = Uuid::new_v4();
        let a = WorkflowStep::new(tid, 1, "a");
        let b = WorkflowStep::new(tid, 2, "b");
        let dossier = Uuid::new_v4();
        let mut ra = ProgressRow::new(dossier, a.id);
        ra.apply(&ProgressPatch::activate(t(5)));
        let mut rb = ProgressRow::new(dossier, b.id);
        rb.apply(&ProgressPatch::activate(t(5)));
        let timeline = compose_timeline(&[a.clone(), b.clone()], &[ra, rb], vec![ev(SideEventKind::Comment, 5)], t(60));
        assert_eq!(timeline.groups[0].step.id, b.id);
        assert_eq!(timeline.groups[1].step.id, a.id);
        // Empate: el evento queda en el paso de menor step_number.
        assert_eq!(timeline.groups[1].lane_a.len(), 1);
        assert!(timeline.groups[0].lane_a.is_empty());
    }

    #[test]
    fn steps_without_rows_are_undated_pending() {
        let tid = Uuid::new_v4();
        let a = WorkflowStep::new(tid, 1, "a");
        let timeline = compose_timeline(&[a], &[], vec![ev(SideEventKind::Task, 1)], t(2));
        assert_eq!(timeline.groups.len(), 1);
        assert!(timeline.groups[0].progress.is_none());
        assert_eq!(timeline.groups[0].lane_b.len(), 1);
    }

    #[test]
    fn no_steps_no_groups() {
        let timeline = compose_timeline(&[], &[], vec![ev(SideEventKind::Comment, 0)], t(1));
        assert!(timeline.groups.is_empty());
    }
}
