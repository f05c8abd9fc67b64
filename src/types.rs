use serde_json::Value;

/// Simple type system describing the JSON a model must return.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Text,
    /// Free-form source code, carried as a string.
    Code,
    Number,
    Bool,
    /// A string restricted to a fixed set of spellings (enforced on parse, not here).
    OneOf(&'static [&'static str]),
    List(Box<TypeDef>),
    /// Object with arbitrary keys, every value of the given type.
    Map(Box<TypeDef>),
    Object(Vec<FieldDef>),
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: TypeDef,
    pub required: bool,
}

impl FieldDef {
    pub fn required(name: &'static str, ty: TypeDef) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub fn optional(name: &'static str, ty: TypeDef) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

/// Single validation error, with a JSON path.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingField { path: String },
    TypeMismatch { path: String, expected: &'static str, found: &'static str },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingField { path } => {
                write!(f, "Missing required field at path {path}")
            }
            ValidationError::TypeMismatch { path, expected, found } => {
                write!(f, "Type mismatch at {path}: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a serde_json::Value against a TypeDef.
///
/// Optional fields may be absent or `null`. Extra fields are ignored.
pub fn validate(ty: &TypeDef, value: &Value) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_inner(ty, value, "$", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_inner(ty: &TypeDef, value: &Value, path: &str, errors: &mut Vec<ValidationError>) {
    use TypeDef::*;

    let expected = match ty {
        Text | Code | OneOf(_) => "string",
        Number => "number",
        Bool => "boolean",
        List(_) => "array",
        Map(_) | Object(_) => "object",
    };

    match (ty, value) {
        (Text | Code | OneOf(_), Value::String(_)) => {}
        (Number, Value::Number(_)) => {}
        (Bool, Value::Bool(_)) => {}
        (List(inner), Value::Array(items)) => {
            for (idx, item) in items.iter().enumerate() {
                let child_path = format!("{path}[{idx}]");
                validate_inner(inner, item, &child_path, errors);
            }
        }
        (Map(inner), Value::Object(obj)) => {
            for (key, item) in obj {
                let child_path = format!("{path}.{key}");
                validate_inner(inner, item, &child_path, errors);
            }
        }
        (Object(fields), Value::Object(obj)) => {
            for field in fields {
                let field_path = format!("{path}.{}", field.name);
                match obj.get(field.name) {
                    None | Some(Value::Null) if !field.required => {}
                    None => errors.push(ValidationError::MissingField { path: field_path }),
                    Some(v) => validate_inner(&field.ty, v, &field_path, errors),
                }
            }
        }
        _ => errors.push(ValidationError::TypeMismatch {
            path: path.to_string(),
            expected,
            found: value_type_name(value),
        }),
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Human-readable schema description embedded in prompts.
pub fn describe_schema(ty: &TypeDef, indent: usize) -> String {
    use TypeDef::*;
    let pad = " ".repeat(indent);

    match ty {
        Object(fields) => {
            let mut s = format!("{pad}- object with fields:\n");
            for f in fields {
                let marker = if f.required { "" } else { " (optional)" };
                s.push_str(&format!("{pad}  - {}{marker}: ", f.name));
                match &f.ty {
                    List(inner) => {
                        s.push_str("array of:\n");
                        s.push_str(&describe_schema(inner, indent + 4));
                    }
                    Object(_) => {
                        s.push_str("nested object:\n");
                        s.push_str(&describe_schema(&f.ty, indent + 4));
                    }
                    leaf => {
                        s.push_str(&leaf_name(leaf));
                        s.push('\n');
                    }
                }
            }
            s
        }
        List(inner) => {
            let mut s = format!("{pad}- array of:\n");
            s.push_str(&describe_schema(inner, indent + 2));
            s
        }
        leaf => format!("{pad}- {}\n", leaf_name(leaf)),
    }
}

fn leaf_name(ty: &TypeDef) -> String {
    match ty {
        TypeDef::Text => "string".to_string(),
        TypeDef::Code => "string (complete source code)".to_string(),
        TypeDef::Number => "number".to_string(),
        TypeDef::Bool => "boolean".to_string(),
        TypeDef::OneOf(options) => format!("one of \"{}\"", options.join("\" | \"")),
        TypeDef::Map(inner) => format!("object mapping names to {}", leaf_name(inner)),
        TypeDef::List(_) => "array".to_string(),
        TypeDef::Object(_) => "object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TypeDef {
        TypeDef::Object(vec![
            FieldDef::required("name", TypeDef::Text),
            FieldDef::optional("code", TypeDef::Code),
            FieldDef::optional("tags", TypeDef::List(Box::new(TypeDef::Text))),
        ])
    }

    #[test]
    fn test_optional_fields_may_be_missing_or_null() {
        assert!(validate(&sample(), &json!({"name": "Header"})).is_ok());
        assert!(validate(&sample(), &json!({"name": "Header", "code": null})).is_ok());
    }

    #[test]
    fn test_reports_paths() {
        let errors = validate(&sample(), &json!({"tags": ["a", 3]})).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingField { path: "$.name".into() },
                ValidationError::TypeMismatch {
                    path: "$.tags[1]".into(),
                    expected: "string",
                    found: "number",
                },
            ]
        );
    }

    #[test]
    fn test_describe_schema_marks_optional() {
        let text = describe_schema(&sample(), 0);
        assert!(text.contains("- name: string"));
        assert!(text.contains("- code (optional): string (complete source code)"));
        assert!(text.contains("- tags (optional): array of:"));
    }
}
