use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Per-target error embedded in an otherwise successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Multi-target response: successes keyed by id plus embedded failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultOf<T> {
    #[serde(default = "HashMap::new")]
    pub data: HashMap<Uuid, T>,
    #[serde(default)]
    pub errors: Vec<ErrorPayload>,
}

impl<T> Default for ResultOf<T> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> ResultOf<T> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fold another chunk's result into this one.
    pub fn merge(&mut self, other: ResultOf<T>) {
        self.data.extend(other.data);
        self.errors.extend(other.errors);
    }
}
