use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;
use uuid::Uuid;

use dossier_core::{DossierId, EngineError, SideEvent, SideEventKind, SideEventSource, StepId};

use super::records::WORKFLOW_COMMENT;
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{appointments, dossier_attachments, dossier_comments, dossier_step_annotations, tasks};

/// Proyección de `dossier_comments`, `dossier_attachments`, `tasks`,
/// `appointments` y `dossier_step_annotations` a `SideEvent`.
///
/// Los comentarios de auditoría del motor (`comment_type = 'workflow'`) se
/// excluyen: la línea de tiempo los recibe desde `ProgressStore::audit_log`.
pub struct PgSideEventSource<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgSideEventSource<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

type CommentTuple = (Uuid, String, Uuid, Option<Uuid>, DateTime<Utc>);
type AttachmentTuple = (Uuid, String, Option<String>, Option<Uuid>, Option<Uuid>, DateTime<Utc>);
type TaskTuple = (Uuid, String, Option<String>, String, Option<Uuid>, Option<Uuid>, Option<Uuid>, DateTime<Utc>);
type AppointmentTuple = (Uuid, String, Option<String>, String, Option<Uuid>, Option<Uuid>, DateTime<Utc>);
type AnnotationTuple = (Uuid, String, Option<Uuid>, Uuid, DateTime<Utc>);

fn event(id: Uuid, kind: SideEventKind, timestamp: DateTime<Utc>, title: String) -> SideEvent {
    SideEvent { id, ..SideEvent::new(kind, timestamp, title) }
}

fn load_events(conn: &mut PgConnection,
               dossier_id: DossierId,
               step_ids: &[StepId])
               -> Result<Vec<SideEvent>, PersistenceError> {
    let mut out = Vec::new();

    let comments: Vec<CommentTuple> =
        dossier_comments::table.filter(dossier_comments::dossier_id.eq(dossier_id))
                               .filter(dossier_comments::comment_type.ne(WORKFLOW_COMMENT))
                               .select((dossier_comments::id,
                                        dossier_comments::content,
                                        dossier_comments::author_id,
                                        dossier_comments::workflow_step_id,
                                        dossier_comments::created_at))
                               .load(conn)?;
    out.extend(comments.into_iter().map(|(id, content, author, step, ts)| {
                                       let title = content.clone();
                                       SideEvent { content: Some(content),
                                                   created_by: Some(author),
                                                   workflow_step_id: step,
                                                   ..event(id, SideEventKind::Comment, ts, title) }
                                   }));

    let attachments: Vec<AttachmentTuple> =
        dossier_attachments::table.filter(dossier_attachments::dossier_id.eq(dossier_id))
                                  .select((dossier_attachments::id,
                                           dossier_attachments::file_name,
                                           dossier_attachments::description,
                                           dossier_attachments::uploaded_by,
                                           dossier_attachments::workflow_step_id,
                                           dossier_attachments::created_at))
                                  .load(conn)?;
    out.extend(attachments.into_iter().map(|(id, file_name, description, by, step, ts)| {
                                          SideEvent { content: description,
                                                      created_by: by,
                                                      workflow_step_id: step,
                                                      ..event(id, SideEventKind::Document, ts, file_name) }
                                      }));

    // Las tareas pueden no tener dossier y colgar solo de un paso de plantilla.
    let task_rows: Vec<TaskTuple> = tasks::table.filter(tasks::dossier_id.eq(dossier_id).or(tasks::dossier_id.is_null()
                                                                                .and(tasks::workflow_step_id.eq_any(step_ids.to_vec()))))
                                                .select((tasks::id,
                                                         tasks::title,
                                                         tasks::description,
                                                         tasks::status,
                                                         tasks::created_by,
                                                         tasks::assigned_to,
                                                         tasks::workflow_step_id,
                                                         tasks::created_at))
                                                .load(conn)?;
    out.extend(task_rows.into_iter().map(|(id, title, description, status, by, to, step, ts)| {
                                        SideEvent { content: description,
                                                    status: Some(status),
                                                    created_by: by,
                                                    assigned_to: to,
                                                    workflow_step_id: step,
                                                    ..event(id, SideEventKind::Task, ts, title) }
                                    }));

    let appointment_rows: Vec<AppointmentTuple> =
        appointments::table.filter(appointments::dossier_id.eq(dossier_id))
                           .select((appointments::id,
                                    appointments::title,
                                    appointments::description,
                                    appointments::status,
                                    appointments::created_by,
                                    appointments::workflow_step_id,
                                    appointments::start_time))
                           .load(conn)?;
    out.extend(appointment_rows.into_iter().map(|(id, title, description, status, by, step, ts)| {
                                               SideEvent { content: description,
                                                           status: Some(status),
                                                           created_by: by,
                                                           workflow_step_id: step,
                                                           ..event(id, SideEventKind::Appointment, ts, title) }
                                           }));

    let annotations: Vec<AnnotationTuple> =
        dossier_step_annotations::table.filter(dossier_step_annotations::dossier_id.eq(dossier_id))
                                       .select((dossier_step_annotations::id,
                                                dossier_step_annotations::content,
                                                dossier_step_annotations::created_by,
                                                dossier_step_annotations::workflow_step_id,
                                                dossier_step_annotations::created_at))
                                       .load(conn)?;
    out.extend(annotations.into_iter().map(|(id, content, by, step, ts)| {
                                          let title = content.clone();
                                          SideEvent { content: Some(content),
                                                      created_by: by,
                                                      workflow_step_id: Some(step),
                                                      ..event(id, SideEventKind::Annotation, ts, title) }
                                      }));
    Ok(out)
}

impl<P: ConnectionProvider> SideEventSource for PgSideEventSource<P> {
    fn side_events(&self, dossier_id: DossierId, step_ids: &[StepId]) -> Result<Vec<SideEvent>, EngineError> {
        let events = with_retry(|| {
                         let mut conn = self.provider.connection()?;
                         load_events(&mut conn, dossier_id, step_ids)
                     })?;
        debug!("side_events:done dossier_id={dossier_id} count={}", events.len());
        Ok(events)
    }
}
