//! dossierflow: motor de workflow de dossiers multi-mundo.
//!
//! Este crate une los miembros del workspace: `dossier-core` (motor),
//! `dossier-persistence` (Postgres) y `dossier-client` (sesión optimista),
//! y añade configuración, errores de aplicación y la demo.
pub mod app;
pub mod config;
pub mod errors;

pub use app::{build_memory_service, build_pg_service, demo_template, run_demo, DemoDossier, DemoReport};
pub use config::{init_logging, AppConfig, Backend};
pub use errors::AppError;
