//! Canonicalización por tipo de campo.
//!
//! Texto crudo se intenta en orden: JSON, delimitado, escalar. Si los tres
//! fallan el campo es `malformed-field` con el valor original en el mensaje.
//! Un escalar donde se esperaba lista se convierte en lista de un elemento.
use chem_domain::ValidationIssue;
use serde_json::Value;

use crate::flexible::FlexibleValue;

type Canon<T> = Result<T, ValidationIssue>;

fn malformed(field: &str, raw: &FlexibleValue, expected: &str, example: &str) -> ValidationIssue {
    ValidationIssue::malformed(field,
                               format!("could not read {:?} as {expected}", raw.display_raw()),
                               example)
}

fn split_delimited(text: &str) -> Vec<String> {
    text.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Núcleo común de las listas: `item` decide si un elemento es válido.
fn canonical_list<T>(field: &str,
                     raw: &FlexibleValue,
                     expected: &str,
                     example: &str,
                     item: impl Fn(&Value) -> Option<T>)
                     -> Canon<Vec<T>> {
    let all = |values: &[Value]| values.iter().map(&item).collect::<Option<Vec<T>>>();
    match raw {
        FlexibleValue::ParsedList(values) => all(values).ok_or_else(|| malformed(field, raw, expected, example)),
        FlexibleValue::ParsedScalar(Value::Null) => Ok(Vec::new()),
        FlexibleValue::ParsedScalar(v) => item(v).map(|x| vec![x])
                                                 .ok_or_else(|| malformed(field, raw, expected, example)),
        FlexibleValue::Raw(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(Vec::new());
            }
            // 1. JSON
            if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                let parsed_ok = match &parsed {
                    Value::Array(values) => all(values),
                    Value::Null => Some(Vec::new()),
                    other => item(other).map(|x| vec![x]),
                };
                if let Some(values) = parsed_ok {
                    return Ok(values);
                }
            }
            // 2. delimitado
            let tokens: Vec<Value> = split_delimited(trimmed).into_iter().map(Value::String).collect();
            if !tokens.is_empty() {
                if let Some(values) = all(&tokens) {
                    return Ok(values);
                }
            }
            // 3. escalar
            item(&Value::String(trimmed.to_string())).map(|x| vec![x])
                                                     .ok_or_else(|| malformed(field, raw, expected, example))
        }
    }
}

fn int_item(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
                                         n.as_f64()
                                          .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                                          .map(|f| f as i64)
                                     }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_item(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn bool_item(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Lista de enteros positivos (multiplicidades, índices).
pub fn to_positive_int_list(field: &str, raw: &FlexibleValue) -> Canon<Vec<u32>> {
    canonical_list(field, raw, "a list of positive integers", "[1, 3, 5]", |v| {
        int_item(v).filter(|n| *n > 0).and_then(|n| u32::try_from(n).ok())
    })
}

/// Lista de textos no vacíos (tareas, etiquetas).
pub fn to_string_list(field: &str, raw: &FlexibleValue) -> Canon<Vec<String>> {
    canonical_list(field, raw, "a list of strings", "[\"optimize\", \"frequencies\"]", string_item)
}

/// Escalar: JSON primero, luego el texto tal cual. Nunca una lista, salvo
/// una lista de exactamente un elemento.
fn canonical_scalar<T>(field: &str,
                       raw: &FlexibleValue,
                       expected: &str,
                       example: &str,
                       item: impl Fn(&Value) -> Option<T>)
                       -> Canon<Option<T>> {
    match raw {
        FlexibleValue::ParsedScalar(Value::Null) => Ok(None),
        FlexibleValue::ParsedScalar(v) => item(v).map(Some).ok_or_else(|| malformed(field, raw, expected, example)),
        FlexibleValue::ParsedList(values) if values.len() == 1 => {
            item(&values[0]).map(Some).ok_or_else(|| malformed(field, raw, expected, example))
        }
        FlexibleValue::ParsedList(_) => Err(malformed(field, raw, expected, example)),
        FlexibleValue::Raw(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                if let Some(x) = item(&parsed) {
                    return Ok(Some(x));
                }
            }
            item(&Value::String(trimmed.to_string())).map(Some)
                                                     .ok_or_else(|| malformed(field, raw, expected, example))
        }
    }
}

pub fn to_int(field: &str, raw: &FlexibleValue) -> Canon<Option<i64>> {
    canonical_scalar(field, raw, "an integer", "0", int_item)
}

pub fn to_bool(field: &str, raw: &FlexibleValue) -> Canon<Option<bool>> {
    canonical_scalar(field, raw, "a boolean", "true", bool_item)
}

/// Texto opcional; vacío equivale a ausente.
pub fn to_opt_string(field: &str, raw: &FlexibleValue) -> Canon<Option<String>> {
    canonical_scalar(field, raw, "a string", "\"water\"", string_item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chem_domain::IssueKind;
    use serde_json::json;

    #[test]
    fn int_list_accepts_every_shape() {
        let expected = vec![1, 3, 5];
        for raw in [FlexibleValue::raw("[1, 3, 5]"),
                    FlexibleValue::raw("1,3,5"),
                    FlexibleValue::raw("1; 3; 5"),
                    FlexibleValue::raw("1 3 5"),
                    FlexibleValue::raw("[1, 3, 5"),
                    FlexibleValue::ParsedList(vec![json!(1), json!("3"), json!(5.0)])]
        {
            assert_eq!(to_positive_int_list("multiplicities", &raw).unwrap(), expected, "{raw:?}");
        }
    }

    #[test]
    fn bare_scalar_becomes_single_element_list() {
        assert_eq!(to_positive_int_list("m", &FlexibleValue::raw("2")).unwrap(), vec![2]);
        assert_eq!(to_positive_int_list("m", &FlexibleValue::ParsedScalar(json!(4))).unwrap(), vec![4]);
        assert_eq!(to_string_list("tasks", &FlexibleValue::raw("optimize")).unwrap(), vec!["optimize"]);
    }

    #[test]
    fn empty_and_null_are_empty_lists() {
        assert!(to_positive_int_list("m", &FlexibleValue::raw("  ")).unwrap().is_empty());
        assert!(to_string_list("t", &FlexibleValue::ParsedScalar(Value::Null)).unwrap().is_empty());
        assert!(to_string_list("t", &FlexibleValue::raw("[]")).unwrap().is_empty());
    }

    #[test]
    fn unreadable_field_names_field_and_raw_value() {
        let err = to_positive_int_list("multiplicities", &FlexibleValue::raw("one, three")).unwrap_err();
        assert_eq!(err.kind, IssueKind::MalformedField);
        assert_eq!(err.field.as_deref(), Some("multiplicities"));
        assert!(err.explanation.contains("one, three"));
        assert_eq!(err.example, "[1, 3, 5]");

        assert!(to_positive_int_list("m", &FlexibleValue::raw("0, 2")).is_err());
        assert!(to_positive_int_list("m", &FlexibleValue::raw("-1")).is_err());
    }

    #[test]
    fn string_list_from_json_and_quotes() {
        let raw = FlexibleValue::raw(r#"["optimize", "frequencies"]"#);
        assert_eq!(to_string_list("tasks", &raw).unwrap(), vec!["optimize", "frequencies"]);
        let raw = FlexibleValue::raw("['optimize', 'frequencies']");
        assert_eq!(to_string_list("tasks", &raw).unwrap(), vec!["optimize", "frequencies"]);
    }

    #[test]
    fn scalars() {
        assert_eq!(to_bool("starred", &FlexibleValue::raw("Yes")).unwrap(), Some(true));
        assert_eq!(to_bool("starred", &FlexibleValue::raw("false")).unwrap(), Some(false));
        assert_eq!(to_bool("starred", &FlexibleValue::ParsedScalar(json!(0))).unwrap(), Some(false));
        assert!(to_bool("starred", &FlexibleValue::raw("maybe")).is_err());

        assert_eq!(to_int("charge", &FlexibleValue::raw("-2")).unwrap(), Some(-2));
        assert_eq!(to_int("charge", &FlexibleValue::raw("")).unwrap(), None);
        assert_eq!(to_int("charge", &FlexibleValue::ParsedList(vec![json!(1)])).unwrap(), Some(1));
        assert!(to_int("charge", &FlexibleValue::raw("1,2")).is_err());

        assert_eq!(to_opt_string("solvent", &FlexibleValue::raw(" water ")).unwrap(), Some("water".into()));
        assert_eq!(to_opt_string("solvent", &FlexibleValue::raw("\"thf\"")).unwrap(), Some("thf".into()));
    }
}
