use dossier_core::rpc::RemoteError;
use dossier_core::ErrorClass;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Ya hay una acción en curso en esta sesión.
    #[error("another action is in flight")]
    Busy,
    /// El motor rechazó la petición.
    #[error("rejected: {0}")]
    Rejected(RemoteError),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Busy => ErrorClass::Conflict,
            ClientError::Rejected(e) => e.class(),
            ClientError::Transport(_) => ErrorClass::Transport,
        }
    }
}

impl From<RemoteError> for ClientError {
    fn from(e: RemoteError) -> Self {
        ClientError::Rejected(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_remote_kind() {
        let rejected = ClientError::Rejected(RemoteError::new("ValidationError", "missing"));
        assert_eq!(rejected.class(), ErrorClass::Validation);
        assert_eq!(ClientError::Busy.class(), ErrorClass::Conflict);
        assert_eq!(ClientError::Transport("reset".into()).to_string(), "transport error: reset");
    }
}
