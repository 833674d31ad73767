//! Motor de transiciones: única vía autorizada para mutar el progreso de un
//! dossier, más las lecturas derivadas (progreso, resumen, línea de tiempo).

mod core;
mod queries;
mod requests;

pub use core::TransitionEngine;
pub use queries::ProgressSummary;
pub use requests::{CompleteStep, ReopenStep, StatusOverride, TransitionOutcome};
