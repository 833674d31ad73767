//! Constantes del motor.

/// Versión lógica del motor de transiciones. Forma parte del
/// `definition_hash` de cada plantilla, de modo que un cambio incompatible en
/// la semántica de transición invalide los hashes registrados en auditoría.
pub const ENGINE_VERSION: &str = "WF1.0";
