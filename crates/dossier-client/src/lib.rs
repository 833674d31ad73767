//! dossier-client: reconciliación optimista del lado cliente.
//!
//! La sesión aplica un cambio tentativo a su copia local, invoca el motor
//! remoto y siempre reemplaza su estado por el que devuelve el servidor.
//! Nunca resuelve conflictos localmente ni reintenta por su cuenta.

pub mod client;
pub mod error;
pub mod session;

pub use client::{InProcessClient, TransitionClient};
pub use error::ClientError;
pub use session::{DossierView, Notice, OptimisticSession};
