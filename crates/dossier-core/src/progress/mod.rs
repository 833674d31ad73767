//! Estado persistido de progreso por (dossier, paso) y el contrato del store.

mod memory;
mod store;
mod types;

pub use memory::InMemoryProgressStore;
pub use store::{build_initial_rows, initialize_in, ProgressStore, ProgressTx};
pub use types::{ProgressPatch, ProgressRow, StepStatus};
