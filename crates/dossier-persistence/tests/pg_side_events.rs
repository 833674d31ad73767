
use chrono::{Duration, Utc};
use diesel::prelude::*;
use dossier_core::{CompleteStep, SideEventKind, SideEventSource};
use dossier_persistence::pg::{PgSideEventSource, PoolProvider};
use dossier_persistence::schema::{appointments, dossier_comments, tasks};
use test_support::{seed_linear, with_pool};
use uuid::Uuid;

#[test]
fn side_events_exclude_workflow_comments_and_feed_the_timeline() {
    with_pool(|pool| {
        let s = seed_linear(pool);
        s.engine.complete_step(&s.agent, &CompleteStep::new(s.dossier, s.steps[0].id)).unwrap();

        let mut conn = pool.get().unwrap();
        diesel::insert_into(dossier_comments::table).values((dossier_comments::id.eq(Uuid::new_v4()),
                                                            dossier_comments::dossier_id.eq(s.dossier),
                                                            dossier_comments::author_id.eq(s.agent.id),
                                                            dossier_comments::content.eq("client called"),
                                                            dossier_comments::comment_type.eq("user")))
                                                    .execute(&mut conn)
                                                    .unwrap();
        diesel::insert_into(tasks::table).values((tasks::id.eq(Uuid::new_v4()),
                                                 tasks::dossier_id.eq(s.dossier),
                                                 tasks::title.eq("collect payslips"),
                                                 tasks::status.eq("todo")))
                                         .execute(&mut conn)
                                         .unwrap();
        diesel::insert_into(appointments::table).values((appointments::id.eq(Uuid::new_v4()),
                                                        appointments::dossier_id.eq(s.dossier),
                                                        appointments::title.eq("visit"),
                                                        appointments::start_time.eq(Utc::now() + Duration::days(2))))
                                                .execute(&mut conn)
                                                .unwrap();
        drop(conn);

        let source = PgSideEventSource::new(PoolProvider::new(pool.clone()));
        let step_ids: Vec<Uuid> = s.steps.iter().map(|st| st.id).collect();
        let events = source.side_events(s.dossier, &step_ids).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events.iter().filter(|e| e.kind == SideEventKind::Comment).count(), 1);

        let timeline = s.engine.timeline(&s.agent, s.dossier, &source, Utc::now()).unwrap();
        // 3 eventos laterales + 2 comentarios de auditoría.
        assert_eq!(timeline.event_count(), 5);
        let top = &timeline.groups[0];
        assert!(top.lane_b.iter().any(|e| e.title == "visit"));
    });
}

#[test]
fn step_tasks_without_dossier_are_included_for_the_template_steps() {
    with_pool(|pool| {
        let s = seed_linear(pool);
        let mut conn = pool.get().unwrap();
        diesel::insert_into(tasks::table).values((tasks::id.eq(Uuid::new_v4()),
                                                 tasks::workflow_step_id.eq(s.steps[1].id),
                                                 tasks::title.eq("verify income"),
                                                 tasks::status.eq("todo")))
                                         .execute(&mut conn)
                                         .unwrap();
        diesel::insert_into(tasks::table).values((tasks::id.eq(Uuid::new_v4()),
                                                 tasks::workflow_step_id.eq(Uuid::new_v4()),
                                                 tasks::title.eq("unrelated"),
                                                 tasks::status.eq("todo")))
                                         .execute(&mut conn)
                                         .unwrap();
        drop(conn);

        let source = PgSideEventSource::new(PoolProvider::new(pool.clone()));
        let step_ids: Vec<Uuid> = s.steps.iter().map(|st| st.id).collect();
        let events = source.side_events(s.dossier, &step_ids).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "verify income");
        assert_eq!(events[0].workflow_step_id, Some(s.steps[1].id));
        assert!(source.side_events(s.dossier, &[]).unwrap().is_empty());
    });
}
