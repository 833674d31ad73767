//! Implementaciones Postgres (Diesel) de los traits del core.
//!
//! - `PgProgressStore`: progreso por dossier. Cada `transact` abre una
//!   transacción read-write, bloquea la fila del dossier y sus filas de
//!   progreso (`SELECT … FOR UPDATE`) y escribe la auditoría en
//!   `dossier_comments` dentro de la misma transacción.
//! - `PgTemplateCatalog`: plantillas, pasos y mundo de cada dossier.
//! - `PgSideEventSource`: proyección de las tablas laterales a `SideEvent`.
//!
//! Las lecturas reintentan con backoff ante errores transitorios; las
//! transacciones no se reintentan porque el cuerpo (`FnOnce`) no es
//! repetible.

mod catalog;
mod progress;
mod records;
mod side_events;

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::warn;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub use catalog::PgTemplateCatalog;
pub use progress::PgProgressStore;
pub use side_events::PgSideEventSource;

/// Pool r2d2 de conexiones Postgres. Al construirlo se corren las migraciones
/// pendientes una sola vez.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o un
/// proveedor de test sin acoplar los stores a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Conexión lista o `PersistenceError::TransientIo`.
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool`. Clonar comparte el pool.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl PoolProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        // Algunos mensajes llegan como Unknown con texto; match por contenido
        // sin acoplar a SQLSTATE.
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("terminating connection due to administrator command")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal (hasta 3 reintentos: 15ms, 30ms, 45ms).
/// Emite `warn!` por intento.
pub(crate) fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Construye un pool Postgres r2d2 y corre las migraciones.
///
/// Si `min_size > max_size` se usa `min = max`; tamaños 0 se elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
