//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y decide qué backend de progreso usar.
//! La conexión Postgres se configura aparte (`dossier_persistence::DbConfig`).
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;

use crate::errors::AppError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

/// Filtro de logs cuando `RUST_LOG` no está definido.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Postgres,
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Backend::Memory),
            "postgres" | "pg" => Ok(Backend::Postgres),
            other => Err(AppError::Config(format!("backend desconocido '{other}'"))),
        }
    }
}

/// Configuración de la aplicación (extensible).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `DOSSIERFLOW_BACKEND`: memory (por defecto) o postgres.
    pub backend: Backend,
    /// Filtro para env_logger (`RUST_LOG`).
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_vars(env::var("DOSSIERFLOW_BACKEND").ok(), env::var("RUST_LOG").ok())
    }

    fn from_vars(backend: Option<String>, log_filter: Option<String>) -> Result<Self, AppError> {
        let backend = match backend {
            Some(b) if !b.trim().is_empty() => b.parse()?,
            _ => Backend::Memory,
        };
        Ok(Self { backend,
                  log_filter: log_filter.filter(|f| !f.is_empty())
                                        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()) })
    }
}

/// Inicializa env_logger una sola vez; llamadas posteriores se ignoran.
pub fn init_logging(config: &AppConfig) {
    let _ = env_logger::Builder::new().parse_filters(&config.log_filter)
                                      .format_timestamp_millis()
                                      .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_memory_and_info() {
        let cfg = AppConfig::from_vars(None, None).unwrap();
        assert_eq!(cfg.backend, Backend::Memory);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn parses_postgres_aliases() {
        assert_eq!(AppConfig::from_vars(Some("PG".into()), Some("debug".into())).unwrap().backend,
                   Backend::Postgres);
        assert_eq!(" postgres ".parse::<Backend>().unwrap(), Backend::Postgres);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = AppConfig::from_vars(Some("sqlite".into()), None).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("sqlite")));
    }
}
