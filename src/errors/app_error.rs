use dossier_client::ClientError;
use dossier_core::EngineError;
use dossier_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error del motor: {0}")]
    Engine(#[from] EngineError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error del cliente: {0}")]
    Client(#[from] ClientError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
}
