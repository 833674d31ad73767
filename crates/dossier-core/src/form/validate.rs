use chrono::NaiveDate;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{FieldKind, FormField};
use crate::errors::{EngineError, FieldViolation};

static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

static PATTERNS: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

/// Regex de un `pattern` de plantilla, compilada una sola vez por proceso.
pub fn compiled_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(re) = PATTERNS.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    PATTERNS.insert(pattern.to_string(), re.clone());
    Ok(re)
}

/// Falla con el primer campo `text` cuyo `pattern` no compila.
pub fn check_patterns(fields: &[FormField]) -> Result<(), String> {
    for field in fields {
        if let FieldKind::Text { pattern: Some(p), .. } = &field.kind {
            compiled_pattern(p).map_err(|e| format!("field {} has an invalid pattern: {e}", field.name))?;
        }
    }
    Ok(())
}

/// Validador de un valor ya presente (no vacío) para un tipo de campo.
pub type Validator = fn(&FieldKind, &Value) -> Result<(), String>;

/// Tabla de validadores por tipo de campo.
pub fn validator_for(kind: &FieldKind) -> Validator {
    match kind {
        FieldKind::Text { .. } => validate_text,
        FieldKind::Textarea { .. } => validate_textarea,
        FieldKind::Select { .. } => validate_select,
        FieldKind::Date => validate_date,
        FieldKind::Number { .. } => validate_number,
        FieldKind::Boolean => validate_boolean,
        FieldKind::Email => validate_email,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "expected a string".to_string())
}

fn check_len(s: &str, min: Option<usize>, max: Option<usize>) -> Result<(), String> {
    let n = s.chars().count();
    if let Some(min) = min {
        if n < min {
            return Err(format!("shorter than {min} characters"));
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(format!("longer than {max} characters"));
        }
    }
    Ok(())
}

fn validate_text(kind: &FieldKind, value: &Value) -> Result<(), String> {
    let FieldKind::Text { min_length, max_length, pattern } = kind else {
        return Err("field kind mismatch".into());
    };
    let s = as_str(value)?;
    check_len(s, *min_length, *max_length)?;
    if let Some(p) = pattern {
        let re = compiled_pattern(p).map_err(|e| format!("template pattern is invalid: {e}"))?;
        if !re.is_match(s) {
            return Err(format!("does not match pattern {p}"));
        }
    }
    Ok(())
}

fn validate_textarea(kind: &FieldKind, value: &Value) -> Result<(), String> {
    let FieldKind::Textarea { max_length } = kind else {
        return Err("field kind mismatch".into());
    };
    check_len(as_str(value)?, None, *max_length)
}

fn validate_select(kind: &FieldKind, value: &Value) -> Result<(), String> {
    let FieldKind::Select { options } = kind else {
        return Err("field kind mismatch".into());
    };
    let s = as_str(value)?;
    if options.iter().any(|o| o == s) {
        Ok(())
    } else {
        Err(format!("'{s}' is not one of {options:?}"))
    }
}

fn validate_date(_: &FieldKind, value: &Value) -> Result<(), String> {
    let s = as_str(value)?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|_| ()).map_err(|_| format!("'{s}' is not a YYYY-MM-DD date"))
}

fn validate_number(kind: &FieldKind, value: &Value) -> Result<(), String> {
    let FieldKind::Number { min, max } = kind else {
        return Err("field kind mismatch".into());
    };
    // Los inputs HTML envían números como texto; aceptamos ambos.
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| "expected a number".to_string())?;
    if !n.is_finite() {
        return Err("expected a finite number".into());
    }
    if let Some(min) = min {
        if n < *min {
            return Err(format!("below minimum {min}"));
        }
    }
    if let Some(max) = max {
        if n > *max {
            return Err(format!("above maximum {max}"));
        }
    }
    Ok(())
}

fn validate_boolean(_: &FieldKind, value: &Value) -> Result<(), String> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err("expected true or false".into())
    }
}

fn validate_email(_: &FieldKind, value: &Value) -> Result<(), String> {
    let s = as_str(value)?;
    match EMAIL.as_ref() {
        Some(re) if re.is_match(s) => Ok(()),
        Some(_) => Err(format!("'{s}' is not an email address")),
        None => Err("email validator unavailable".into()),
    }
}

/// Valida `form_data` contra los campos del paso.
///
/// `missing` enumera exactamente los campos requeridos ausentes (o nulos /
/// vacíos) en orden de declaración; `invalid` los presentes que no cumplen su
/// restricción. Un `false` en un booleano requerido cuenta como presente.
pub fn validate_form(fields: &[FormField], data: Option<&Value>) -> Result<(), EngineError> {
    if fields.is_empty() {
        return Ok(());
    }
    let empty = serde_json::Map::new();
    let object = match data {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(EngineError::Validation { missing: vec![],
                                                 invalid: vec![FieldViolation { field: "formData".into(),
                                                                                reason: "expected a JSON object".into() }] })
        }
    };

    let mut missing = Vec::new();
    let mut invalid = Vec::new();
    for field in fields {
        match object.get(&field.name) {
            Some(v) if !is_empty(v) => {
                if let Err(reason) = validator_for(&field.kind)(&field.kind, v) {
                    invalid.push(FieldViolation { field: field.name.clone(), reason });
                }
            }
            _ if field.required => missing.push(field.name.clone()),
            _ => {}
        }
    }

    if missing.is_empty() && invalid.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation { missing, invalid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> Vec<FormField> {
        vec![FormField::new("reference", true, FieldKind::Text { min_length: Some(3), max_length: None, pattern: None }),
             FormField::new("amount", true, FieldKind::Number { min: Some(0.0), max: Some(1000.0) }),
             FormField::new("signed", true, FieldKind::Boolean),
             FormField::new("contact", false, FieldKind::Email),]
    }

    #[test]
    fn every_subset_of_required_fields_reports_exact_missing_list() {
        let all = [("reference", json!("ABC-1")), ("amount", json!(12)), ("signed", json!(false))];
        for mask in 0u8..8 {
            let mut data = serde_json::Map::new();
            let mut expected_missing = Vec::new();
            for (i, (name, value)) in all.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    data.insert(name.to_string(), value.clone());
                } else {
                    expected_missing.push(name.to_string());
                }
            }
            let res = validate_form(&fields(), Some(&Value::Object(data)));
            if expected_missing.is_empty() {
                assert!(res.is_ok(), "mask {mask} should pass: {res:?}");
            } else {
                assert_eq!(res, Err(EngineError::Validation { missing: expected_missing, invalid: vec![] }), "mask {mask}");
            }
        }
    }

    #[test]
    fn blank_strings_and_nulls_count_as_missing() {
        let data = json!({"reference": "   ", "amount": null, "signed": true});
        let err = validate_form(&fields(), Some(&data)).unwrap_err();
        assert_eq!(err, EngineError::Validation { missing: vec!["reference".into(), "amount".into()], invalid: vec![] });
    }

    #[test]
    fn constraint_violations_are_reported_separately() {
        let data = json!({"reference": "AB", "amount": "2000", "signed": "yes", "contact": "nope"});
        match validate_form(&fields(), Some(&data)) {
            Err(EngineError::Validation { missing, invalid }) => {
                assert!(missing.is_empty());
                let names: Vec<&str> = invalid.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(names, vec!["reference", "amount", "signed", "contact"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn select_date_and_pattern() {
        let fields = vec![FormField::new("choice", true, FieldKind::Select { options: vec!["yes".into(), "no".into()] }),
                          FormField::new("when", true, FieldKind::Date),
                          FormField::new("code", true, FieldKind::Text { min_length: None, max_length: Some(6), pattern: Some("^[A-Z]+$".into()) }),];
        assert!(validate_form(&fields, Some(&json!({"choice": "no", "when": "2024-02-29", "code": "ABC"}))).is_ok());
        let err = validate_form(&fields, Some(&json!({"choice": "maybe", "when": "29/02/2024", "code": "abc"}))).unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref invalid, .. } if invalid.len() == 3));
    }

    #[test]
    fn non_finite_numbers_are_invalid() {
        let fields = vec![FormField::new("amount", true, FieldKind::Number { min: Some(0.0), max: Some(10.0) })];
        for raw in ["NaN", "inf", "-infinity"] {
            let err = validate_form(&fields, Some(&json!({ "amount": raw }))).unwrap_err();
            assert!(matches!(err, EngineError::Validation { ref invalid, .. } if invalid[0].reason == "expected a finite number"),
                    "{raw} accepted");
        }
        assert!(validate_form(&fields, Some(&json!({ "amount": " 7.5 " }))).is_ok());
    }

    #[test]
    fn patterns_are_checked_once_and_cached() {
        let ok = vec![FormField::new("code", true, FieldKind::Text { min_length: None, max_length: None, pattern: Some("^[0-9]{4}$".into()) })];
        assert!(check_patterns(&ok).is_ok());
        assert!(PATTERNS.contains_key("^[0-9]{4}$"));
        let bad = vec![FormField::new("code", true, FieldKind::Text { min_length: None, max_length: None, pattern: Some("([".into()) })];
        assert!(check_patterns(&bad).unwrap_err().contains("field code"));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = validate_form(&fields(), Some(&json!([1, 2]))).unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref invalid, .. } if invalid[0].field == "formData"));
    }

    #[test]
    fn no_fields_accepts_anything() {
        assert!(validate_form(&[], Some(&json!("whatever"))).is_ok());
        assert!(validate_form(&[], None).is_ok());
    }
}
