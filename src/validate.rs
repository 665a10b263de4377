use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::models::Id;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields in request body: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("invalid value for {0}")]
    InvalidField(String),
}

/// Loosely typed request body, decoded from either a urlencoded form or JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormBody(pub HashMap<String, Value>);

impl FormBody {
    fn present(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.present(name)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Text of a field already checked by [`require_fields`].
    pub fn required_text(&self, name: &str) -> Result<String, ValidationError> {
        self.text(name).ok_or_else(|| ValidationError::MissingFields(vec![name.to_string()]))
    }

    pub fn id(&self, name: &str) -> Result<Id, ValidationError> {
        match self.present(name) {
            None => Err(ValidationError::MissingFields(vec![name.to_string()])),
            Some(v) => parse_id(v).ok_or_else(|| ValidationError::InvalidField(name.to_string())),
        }
    }

    /// Lenient variant: absent or malformed ids read as `None`.
    pub fn opt_id(&self, name: &str) -> Option<Id> {
        self.present(name).and_then(parse_id)
    }
}

fn parse_id(v: &Value) -> Option<Id> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Fails when any of `fields` is absent or null. Never touches the body.
pub fn require_fields(body: &FormBody, fields: &[&str]) -> Result<(), ValidationError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|f| body.present(f).is_none())
        .map(|f| f.to_string())
        .collect();
    if missing.is_empty() { Ok(()) } else { Err(ValidationError::MissingFields(missing)) }
}
