//! Formularios dinámicos por paso.
//!
//! `form_fields` viaja como JSON en la plantilla, pero se modela como una
//! variante cerrada (`FieldKind`) con una tabla de validadores por tipo: añadir
//! un tipo de campo nuevo es una decisión de compilación.

mod field;
mod validate;

pub use field::{FieldKind, FormField};
pub use validate::{check_patterns, compiled_pattern, validate_form, validator_for, Validator};
