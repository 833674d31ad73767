//! dossier-persistence
//!
//! Implementaciones Postgres (Diesel) de los traits de `dossier-core`:
//! `ProgressStore` sobre `dossier_workflow_progress` (con auditoría en
//! `dossier_comments`), `TemplateCatalog` sobre `workflow_templates` /
//! `workflow_steps` / `dossiers`, y `SideEventSource` sobre las tablas
//! laterales que alimentan la línea de tiempo.
//!
//! Módulos:
//! - `pg`: stores, pool y reintentos.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: configuración de conexión desde `.env`.
//! - `schema`: tablas Diesel.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgPool, PgProgressStore, PgSideEventSource,
             PgTemplateCatalog, PoolProvider};
