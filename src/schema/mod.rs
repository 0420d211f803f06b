//! Output schema module
//!
//! Declarative description of the object a query must return. The same schema
//! is rendered into the provider's response schema, described in prompts, and
//! used to validate whatever the model sends back.

use serde_json::{Map, Value};
use std::fmt;

/// Type of a single schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    /// Homogeneous array, items described by the inner spec
    Array(Box<FieldSpec>),
    /// Nested object
    Object(Schema),
}

impl FieldType {
    /// Lowercase type name used in messages and prompt hints
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
        }
    }

    /// Gemini (OpenAPI subset) type name
    fn provider_name(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Number => "NUMBER",
            FieldType::Integer => "INTEGER",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Array(_) => "ARRAY",
            FieldType::Object(_) => "OBJECT",
        }
    }

    fn label(&self) -> String {
        match self {
            FieldType::Array(item) => format!("array of {}", item.field_type.name()),
            other => other.name().to_string(),
        }
    }
}

/// Field description: type plus constraints
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<String>,
    /// Inclusive lower bound, numeric fields only
    pub minimum: Option<f64>,
    /// Inclusive upper bound, numeric fields only
    pub maximum: Option<f64>,
    /// Allowed values, string fields only. Empty means unrestricted.
    pub allowed: Vec<String>,
}

impl FieldSpec {
    /// Required field of the given type with no constraints
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            description: None,
            minimum: None,
            maximum: None,
            allowed: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn array(item: FieldSpec) -> Self {
        Self::new(FieldType::Array(Box::new(item)))
    }

    pub fn object(schema: Schema) -> Self {
        Self::new(FieldType::Object(schema))
    }

    /// Mark the field optional; absent and `null` values are accepted
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach a description, sent to the model as a field hint
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn min(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn max(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Inclusive numeric range
    pub fn range(self, minimum: f64, maximum: f64) -> Self {
        self.min(minimum).max(maximum)
    }

    /// Restrict a string field to a fixed set of values
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path, `$` for the root (`a.b`, `items[2]`)
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Object schema: ordered field name to spec mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any earlier field with the same name
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, spec)| spec)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a parsed JSON value against the schema
    ///
    /// On success returns a copy holding only the declared fields. On failure
    /// returns every violation found, in field order.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();

        let Some(map) = value.as_object() else {
            return Err(vec![FieldError::new(
                "$",
                format!("expected object, got {}", json_type(value)),
            )]);
        };

        let validated = self.validate_object(map, "", &mut errors);

        if errors.is_empty() {
            Ok(Value::Object(validated))
        } else {
            Err(errors)
        }
    }

    fn validate_object(
        &self,
        map: &Map<String, Value>,
        prefix: &str,
        errors: &mut Vec<FieldError>,
    ) -> Map<String, Value> {
        let mut validated = Map::new();

        for (name, spec) in &self.fields {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };

            match map.get(name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        errors.push(FieldError::new(&path, "is required"));
                    }
                }
                Some(value) => {
                    if let Some(value) = validate_value(spec, value, &path, errors) {
                        validated.insert(name.clone(), value);
                    }
                }
            }
        }

        validated
    }

    /// Render the schema in Gemini's `responseSchema` format
    pub fn to_provider_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, spec) in &self.fields {
            properties.insert(name.clone(), spec_to_provider(spec));
            if spec.required {
                required.push(Value::String(name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("OBJECT".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }

    /// Human-readable field list, one line per field
    pub fn describe(&self) -> String {
        let mut out = String::new();
        describe_into(self, "", &mut out);
        out
    }
}

fn validate_value(
    spec: &FieldSpec,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    match &spec.field_type {
        FieldType::String => {
            let Some(text) = value.as_str() else {
                errors.push(type_error(path, spec, value));
                return None;
            };
            if !spec.allowed.is_empty() && !spec.allowed.iter().any(|allowed| allowed == text) {
                errors.push(FieldError::new(
                    path,
                    format!("must be one of [{}], got {:?}", spec.allowed.join(", "), text),
                ));
                return None;
            }
            Some(value.clone())
        }
        FieldType::Number => {
            let Some(number) = value.as_f64() else {
                errors.push(type_error(path, spec, value));
                return None;
            };
            check_range(spec, number, value, path, errors).then(|| value.clone())
        }
        FieldType::Integer => {
            let whole = value.is_i64()
                || value.is_u64()
                || value.as_f64().map(|n| n.fract() == 0.0).unwrap_or(false);
            let Some(number) = value.as_f64().filter(|_| whole) else {
                errors.push(type_error(path, spec, value));
                return None;
            };
            check_range(spec, number, value, path, errors).then(|| value.clone())
        }
        FieldType::Boolean => {
            if value.is_boolean() {
                Some(value.clone())
            } else {
                errors.push(type_error(path, spec, value));
                None
            }
        }
        FieldType::Array(item) => {
            let Some(items) = value.as_array() else {
                errors.push(type_error(path, spec, value));
                return None;
            };
            let before = errors.len();
            let mut validated = Vec::with_capacity(items.len());
            for (index, element) in items.iter().enumerate() {
                let element_path = format!("{}[{}]", path, index);
                if element.is_null() {
                    if item.required {
                        errors.push(FieldError::new(&element_path, "is required"));
                    } else {
                        validated.push(Value::Null);
                    }
                    continue;
                }
                if let Some(element) = validate_value(item, element, &element_path, errors) {
                    validated.push(element);
                }
            }
            (errors.len() == before).then_some(Value::Array(validated))
        }
        FieldType::Object(schema) => {
            let Some(map) = value.as_object() else {
                errors.push(type_error(path, spec, value));
                return None;
            };
            let before = errors.len();
            let validated = schema.validate_object(map, path, errors);
            (errors.len() == before).then_some(Value::Object(validated))
        }
    }
}

fn check_range(
    spec: &FieldSpec,
    number: f64,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> bool {
    if let Some(minimum) = spec.minimum {
        if number < minimum {
            errors.push(FieldError::new(
                path,
                format!("value {} is below minimum {}", value, minimum),
            ));
            return false;
        }
    }
    if let Some(maximum) = spec.maximum {
        if number > maximum {
            errors.push(FieldError::new(
                path,
                format!("value {} is above maximum {}", value, maximum),
            ));
            return false;
        }
    }
    true
}

fn type_error(path: &str, spec: &FieldSpec, value: &Value) -> FieldError {
    FieldError::new(
        path,
        format!("expected {}, got {}", spec.field_type.name(), json_type(value)),
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn spec_to_provider(spec: &FieldSpec) -> Value {
    let mut node = match &spec.field_type {
        FieldType::Object(schema) => match schema.to_provider_schema() {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        other => {
            let mut map = Map::new();
            map.insert("type".to_string(), Value::String(other.provider_name().to_string()));
            map
        }
    };

    if let Some(description) = &spec.description {
        node.insert("description".to_string(), Value::String(description.clone()));
    }
    if !spec.required {
        node.insert("nullable".to_string(), Value::Bool(true));
    }

    match &spec.field_type {
        FieldType::Number | FieldType::Integer => {
            if let Some(minimum) = spec.minimum {
                node.insert("minimum".to_string(), Value::from(minimum));
            }
            if let Some(maximum) = spec.maximum {
                node.insert("maximum".to_string(), Value::from(maximum));
            }
        }
        FieldType::String if !spec.allowed.is_empty() => {
            node.insert("format".to_string(), Value::String("enum".to_string()));
            node.insert(
                "enum".to_string(),
                Value::Array(spec.allowed.iter().cloned().map(Value::String).collect()),
            );
        }
        FieldType::Array(item) => {
            node.insert("items".to_string(), spec_to_provider(item));
        }
        _ => {}
    }

    Value::Object(node)
}

fn describe_into(schema: &Schema, indent: &str, out: &mut String) {
    for (name, spec) in &schema.fields {
        let mut attrs = vec![spec.field_type.label()];
        attrs.push(if spec.required { "required" } else { "optional" }.to_string());
        match (spec.minimum, spec.maximum) {
            (Some(min), Some(max)) => attrs.push(format!("{} to {}", min, max)),
            (Some(min), None) => attrs.push(format!(">= {}", min)),
            (None, Some(max)) => attrs.push(format!("<= {}", max)),
            (None, None) => {}
        }
        if !spec.allowed.is_empty() {
            attrs.push(format!("one of: {}", spec.allowed.join(", ")));
        }

        out.push_str(&format!("{}- {} ({})", indent, name, attrs.join(", ")));
        if let Some(description) = &spec.description {
            out.push_str(": ");
            out.push_str(description);
        }
        out.push('\n');

        let nested = match &spec.field_type {
            FieldType::Object(inner) => Some(inner),
            FieldType::Array(item) => match &item.field_type {
                FieldType::Object(inner) => Some(inner),
                _ => None,
            },
            _ => None,
        };
        if let Some(inner) = nested {
            describe_into(inner, &format!("{}  ", indent), out);
        }
    }
}
