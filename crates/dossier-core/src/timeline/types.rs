use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::model::{StepId, UserId};
use crate::progress::ProgressRow;
use crate::template::WorkflowStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEventKind {
    Comment,
    Document,
    Task,
    Appointment,
    Annotation,
}

/// Carril de presentación dentro de una ventana.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lane {
    /// documentos, comentarios, anotaciones
    A,
    /// tareas y citas
    B,
}

impl SideEventKind {
    pub fn lane(&self) -> Lane {
        match self {
            SideEventKind::Comment | SideEventKind::Document | SideEventKind::Annotation => Lane::A,
            SideEventKind::Task | SideEventKind::Appointment => Lane::B,
        }
    }
}

/// Proyección unificada de una fila de tabla lateral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEvent {
    pub id: Uuid,
    pub kind: SideEventKind,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub content: Option<String>,
    pub status: Option<String>,
    pub created_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
    /// Asociación explícita opcional; sólo informativa, la ubicación es
    /// temporal.
    pub workflow_step_id: Option<StepId>,
}

impl SideEvent {
    pub fn new(kind: SideEventKind, timestamp: DateTime<Utc>, title: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               kind,
               timestamp,
               title: title.into(),
               content: None,
               status: None,
               created_by: None,
               assigned_to: None,
               workflow_step_id: None }
    }
}

impl From<&AuditEntry> for SideEvent {
    fn from(entry: &AuditEntry) -> Self {
        Self { id: entry.id,
               kind: SideEventKind::Comment,
               timestamp: entry.ts,
               title: entry.message(),
               content: None,
               status: Some(entry.kind.event_type().to_string()),
               created_by: Some(entry.author_id),
               assigned_to: None,
               workflow_step_id: entry.step_id }
    }
}

/// Un paso con los eventos de su ventana temporal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineGroup {
    pub step: WorkflowStep,
    pub progress: Option<ProgressRow>,
    /// `completed_at`, si no `started_at`, si no el "ahora" de la composición.
    pub anchor: DateTime<Utc>,
    /// `false` cuando el ancla es el centinela "ahora".
    pub dated: bool,
    pub lane_a: Vec<SideEvent>,
    pub lane_b: Vec<SideEvent>,
}

impl TimelineGroup {
    pub fn events(&self) -> impl Iterator<Item = &SideEvent> {
        self.lane_a.iter().chain(self.lane_b.iter())
    }
}

/// Grupos del más reciente al más antiguo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub groups: Vec<TimelineGroup>,
}

impl Timeline {
    pub fn event_count(&self) -> usize {
        self.groups.iter().map(|g| g.lane_a.len() + g.lane_b.len()).sum()
    }

    pub fn group_for_step(&self, step_id: StepId) -> Option<&TimelineGroup> {
        self.groups.iter().find(|g| g.step.id == step_id)
    }
}
