//! Parameter value coercion and constraint checks

use cirrus_core::{ParameterKind, ParameterSpec, Result, TemplateError, Value};
use regex::Regex;

/// Shape a supplied or default value according to the parameter's declared type.
pub fn coerce(spec: &ParameterSpec, raw: &Value, at: &str) -> Result<Value> {
    match spec.kind() {
        ParameterKind::String => match raw.scalar_text() {
            Some(text) => Ok(Value::String(text)),
            None => Err(violation(spec, raw, at, "expected a single value, not a list or mapping")),
        },
        ParameterKind::Number => number(spec, raw, raw, at),
        ParameterKind::StringList => Ok(Value::List(
            list_items(spec, raw, at)?
                .into_iter()
                .map(Value::String)
                .collect(),
        )),
        ParameterKind::NumberList => list_items(spec, raw, at)?
            .into_iter()
            .map(|item| number(spec, raw, &Value::String(item), at))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
    }
}

/// Check a coerced value against `AllowedValues`, `AllowedPattern` and the bounds.
///
/// List-typed parameters are checked element by element.
pub fn check(spec: &ParameterSpec, value: &Value, at: &str) -> Result<()> {
    let pattern = match &spec.allowed_pattern {
        Some(pattern) => Some(Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            violation(spec, value, at, &format!("AllowedPattern does not compile: {}", e))
        })?),
        None => None,
    };

    let items: Vec<&Value> = match value {
        Value::List(items) => items.iter().collect(),
        other => vec![other],
    };

    for item in items {
        let text = item.scalar_text().unwrap_or_default();

        if let Some(allowed) = &spec.allowed_values {
            let matches = allowed.iter().any(|candidate| {
                candidate.text() == text
                    || matches!((candidate.as_f64(), item.as_f64()), (Some(a), Some(b)) if a == b)
            });
            if !matches {
                let listed: Vec<String> = allowed.iter().map(|v| v.text()).collect();
                return Err(violation(
                    spec,
                    item,
                    at,
                    &format!("must be one of [{}]", listed.join(", ")),
                ));
            }
        }

        if let Some(regex) = &pattern {
            if !regex.is_match(&text) {
                return Err(violation(
                    spec,
                    item,
                    at,
                    &format!("must match pattern {}", regex.as_str()),
                ));
            }
        }

        if let Some(number) = item.as_f64().filter(|_| is_numeric(spec)) {
            if let Some(min) = spec.min_value.filter(|min| number < *min) {
                return Err(violation(spec, item, at, &format!("must be at least {}", min)));
            }
            if let Some(max) = spec.max_value.filter(|max| number > *max) {
                return Err(violation(spec, item, at, &format!("must be at most {}", max)));
            }
        }

        let length = text.chars().count();
        if let Some(min) = spec.min_length.filter(|min| length < *min) {
            return Err(violation(
                spec,
                item,
                at,
                &format!("must be at least {} characters", min),
            ));
        }
        if let Some(max) = spec.max_length.filter(|max| length > *max) {
            return Err(violation(
                spec,
                item,
                at,
                &format!("must be at most {} characters", max),
            ));
        }
    }
    Ok(())
}

fn is_numeric(spec: &ParameterSpec) -> bool {
    matches!(spec.kind(), ParameterKind::Number | ParameterKind::NumberList)
}

fn number(spec: &ParameterSpec, raw: &Value, item: &Value, at: &str) -> Result<Value> {
    let parsed = match item {
        Value::Int(i) => return Ok(Value::Int(*i)),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(Value::Int(f as i64))
        }
        Some(f) if f.is_finite() => Ok(Value::Float(f)),
        _ => Err(violation(spec, raw, at, "expected a number")),
    }
}

fn list_items(spec: &ParameterSpec, raw: &Value, at: &str) -> Result<Vec<String>> {
    match raw {
        Value::List(items) => items
            .iter()
            .map(|item| {
                item.scalar_text()
                    .ok_or_else(|| violation(spec, raw, at, "list items must be scalars"))
            })
            .collect(),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        other => match other.scalar_text() {
            Some(text) => Ok(text.split(',').map(|s| s.trim().to_string()).collect()),
            None => Err(violation(spec, raw, at, "expected a comma-delimited list")),
        },
    }
}

fn violation(spec: &ParameterSpec, value: &Value, at: &str, message: &str) -> TemplateError {
    let message = match &spec.constraint_description {
        Some(description) => format!("{} ({})", message, description),
        None => message.to_string(),
    };
    TemplateError::ParameterConstraint {
        path: at.to_string(),
        name: spec.name.clone(),
        value: value.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::Scalar;
    use pretty_assertions::assert_eq;

    fn spec(ty: &str) -> ParameterSpec {
        ParameterSpec::new("P", ty)
    }

    #[test]
    fn test_coerce_by_type() {
        assert_eq!(
            coerce(&spec("String"), &Value::Int(5), "x").unwrap(),
            Value::string("5")
        );
        assert_eq!(
            coerce(&spec("Number"), &Value::string("4"), "x").unwrap(),
            Value::Int(4)
        );
        assert_eq!(
            coerce(&spec("Number"), &Value::string("0.5"), "x").unwrap(),
            Value::Float(0.5)
        );
        assert_eq!(
            coerce(&spec("CommaDelimitedList"), &Value::string("a, b ,c"), "x").unwrap(),
            Value::list(["a", "b", "c"])
        );
        assert_eq!(
            coerce(&spec("List<Number>"), &Value::string("1,2"), "x").unwrap(),
            Value::list([1i64, 2])
        );
        assert_eq!(
            coerce(&spec("List<AWS::EC2::Subnet::Id>"), &Value::list(["s-1"]), "x").unwrap(),
            Value::list(["s-1"])
        );
    }

    #[test]
    fn test_non_numeric_number_rejected() {
        let err = coerce(&spec("Number"), &Value::string("many"), "Parameters.P").unwrap_err();
        assert_eq!(err.kind(), "ParameterConstraintError");
        assert_eq!(err.path(), Some("Parameters.P"));
    }

    #[test]
    fn test_allowed_values() {
        let mut p = spec("String");
        p.allowed_values = Some(vec![Scalar::Str("dev".into()), Scalar::Str("prod".into())]);
        assert!(check(&p, &Value::string("dev"), "x").is_ok());
        let err = check(&p, &Value::string("qa"), "x").unwrap_err();
        assert!(err.to_string().contains("must be one of [dev, prod]"));

        let mut n = spec("Number");
        n.allowed_values = Some(vec![Scalar::Int(7), Scalar::Int(30)]);
        assert!(check(&n, &Value::Int(30), "x").is_ok());
        assert!(check(&n, &Value::Float(30.0), "x").is_ok());
        assert!(check(&n, &Value::Int(31), "x").is_err());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let mut p = spec("String");
        p.allowed_pattern = Some("[a-z]+".into());
        assert!(check(&p, &Value::string("abc"), "x").is_ok());
        assert!(check(&p, &Value::string("abc1"), "x").is_err());
    }

    #[test]
    fn test_bounds() {
        let mut n = spec("Number");
        n.min_value = Some(0.0);
        n.max_value = Some(10.0);
        assert!(check(&n, &Value::Int(10), "x").is_ok());
        assert!(check(&n, &Value::Int(11), "x").is_err());
        assert!(check(&n, &Value::Int(-1), "x").is_err());

        let mut s = spec("String");
        s.min_length = Some(2);
        s.max_length = Some(3);
        assert!(check(&s, &Value::string("ab"), "x").is_ok());
        assert!(check(&s, &Value::string("a"), "x").is_err());
        assert!(check(&s, &Value::string("abcd"), "x").is_err());
    }

    #[test]
    fn test_constraint_description_in_message() {
        let mut p = spec("String");
        p.max_length = Some(1);
        p.constraint_description = Some("single letter".into());
        let err = check(&p, &Value::string("ab"), "x").unwrap_err();
        assert!(err.to_string().contains("(single letter)"));
    }

    #[test]
    fn test_list_elements_checked() {
        let mut p = spec("CommaDelimitedList");
        p.allowed_values = Some(vec![Scalar::Str("a".into()), Scalar::Str("b".into())]);
        assert!(check(&p, &Value::list(["a", "b"]), "x").is_ok());
        assert!(check(&p, &Value::list(["a", "c"]), "x").is_err());
    }
}
