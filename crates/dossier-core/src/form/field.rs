use serde::{Deserialize, Serialize};

/// Descriptor de un campo de formulario de paso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Tipo del campo y sus restricciones. Serializado con etiqueta `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        min_length: Option<usize>,
        #[serde(default)]
        max_length: Option<usize>,
        #[serde(default)]
        pattern: Option<String>,
    },
    Textarea {
        #[serde(default)]
        max_length: Option<usize>,
    },
    Select {
        #[serde(default)]
        options: Vec<String>,
    },
    Date,
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Boolean,
    Email,
}

impl FormField {
    pub fn new(name: impl Into<String>, required: bool, kind: FieldKind) -> Self {
        let name = name.into();
        Self { label: name.clone(), name, required, kind }
    }
}
