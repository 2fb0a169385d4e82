//! Postman collection document

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A Postman collection, kept as the raw document the runner consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    document: Value,
}

impl Collection {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    /// Accepts either the Postman API envelope (`{"collection": {...}}`) or a
    /// bare collection export.
    pub fn from_document(document: Value) -> Result<Self> {
        match document {
            Value::Object(mut map) => {
                if let Some(inner) = map.remove("collection") {
                    return Self::from_document(inner);
                }
                if map.contains_key("info") || map.contains_key("item") {
                    Ok(Self::new(Value::Object(map)))
                } else {
                    Err(Error::Fetch(
                        "document is not a Postman collection (no info or item)".to_string(),
                    ))
                }
            }
            other => Err(Error::Fetch(format!(
                "expected a JSON object for the collection, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_document(serde_json::from_str(text)?)
    }

    pub fn name(&self) -> Option<&str> {
        self.document.pointer("/info/name").and_then(Value::as_str)
    }

    /// Number of requests, descending into folders.
    pub fn request_count(&self) -> usize {
        count_requests(self.document.get("item"))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }
}

fn count_requests(items: Option<&Value>) -> usize {
    let Some(Value::Array(items)) = items else {
        return 0;
    };

    items
        .iter()
        .map(|item| {
            if item.get("request").is_some() {
                1
            } else {
                count_requests(item.get("item"))
            }
        })
        .sum()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
