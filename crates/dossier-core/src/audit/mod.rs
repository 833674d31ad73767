//! Bitácora de auditoría de transiciones.
//!
//! Cada transición exitosa deja un comentario legible adjunto al dossier
//! ("Step X completed", "Decision for X: yes"). Se escribe en la misma
//! transacción que la mutación de progreso.

mod types;

pub use types::{AuditEntry, AuditKind};
