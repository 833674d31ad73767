//! Contexto explícito del usuario que actúa.
//!
//! El motor nunca lee estado global de sesión: cada operación recibe un
//! `ActingUser` con sus roles y los mundos (tenants) a los que tiene acceso.

use serde::{Deserialize, Serialize};

use super::{UserId, WorldId};
use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Agent,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: UserId,
    pub roles: Vec<Role>,
    pub world_access: Vec<WorldId>,
}

impl ActingUser {
    pub fn new(id: UserId, roles: Vec<Role>, world_access: Vec<WorldId>) -> Self {
        Self { id, roles, world_access }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Admin y manager pueden hacer overrides administrativos de estado.
    pub fn is_administrator(&self) -> bool {
        self.has_role(Role::Admin) || self.has_role(Role::Manager)
    }

    /// Cualquier rol distinto de `viewer` puede completar pasos.
    pub fn can_transition(&self) -> bool {
        self.roles.iter().any(|r| !matches!(r, Role::Viewer))
    }

    pub fn ensure_world(&self, world_id: WorldId) -> Result<(), EngineError> {
        // Un admin global tiene acceso a todos los mundos.
        if self.has_role(Role::Admin) || self.world_access.contains(&world_id) {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!("user {} has no access to world {world_id}", self.id)))
        }
    }

    pub fn ensure_can_transition(&self, world_id: WorldId) -> Result<(), EngineError> {
        self.ensure_world(world_id)?;
        if self.can_transition() {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!("user {} is read-only", self.id)))
        }
    }

    pub fn ensure_administrator(&self, world_id: WorldId) -> Result<(), EngineError> {
        self.ensure_world(world_id)?;
        if self.is_administrator() {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!("user {} is not an administrator", self.id)))
        }
    }
}
