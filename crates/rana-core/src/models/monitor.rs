use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::string_or_number;

/// A project job (simulation, processing task, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub state: Value,
    #[serde(default)]
    pub process: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A project publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub updated_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
