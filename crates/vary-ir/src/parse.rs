use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map};

use crate::types::{ConfigurationSchema, EnumDomain, NumberDomain};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("numeric domain '{name}' is invalid: {reason}")]
    InvalidNumber { name: String, reason: String },

    #[error("enum domain '{name}' has no values")]
    EmptyEnum { name: String },

    #[error("choice group #{index} has no members")]
    EmptyChoice { index: usize },

    #[error("variable '{name}' is declared more than once")]
    Duplicate { name: String },
}

/// On-disk layout of the schema file. `numbers` and `enums` stay as JSON
/// objects so their key order survives (serde_json `preserve_order`).
#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    booleans: Vec<String>,
    #[serde(default)]
    numbers: Map<String, serde_json::Value>,
    #[serde(default)]
    enums: Map<String, serde_json::Value>,
    #[serde(default)]
    choices: Vec<Vec<String>>,
}

/// Parse and validate a schema from its JSON text.
pub fn parse_schema(json: &str) -> Result<ConfigurationSchema, SchemaError> {
    let file: SchemaFile = serde_json::from_str(json)?;

    let mut numbers = Vec::with_capacity(file.numbers.len());
    for (name, raw) in file.numbers {
        let (min, max, precision): (f64, f64, i32) = serde_json::from_value(raw)?;
        numbers.push(NumberDomain {
            name,
            min,
            max,
            precision,
        });
    }

    let mut enums = Vec::with_capacity(file.enums.len());
    for (name, raw) in file.enums {
        let values: Vec<String> = serde_json::from_value(raw)?;
        enums.push(EnumDomain { name, values });
    }

    let schema = ConfigurationSchema {
        booleans: file.booleans,
        numbers,
        enums,
        choices: file.choices,
    };
    validate_schema(&schema)?;
    Ok(schema)
}

/// Read and parse a schema file (usually `variables.json`).
pub fn load_schema(path: impl AsRef<Path>) -> Result<ConfigurationSchema, SchemaError> {
    let text = std::fs::read_to_string(path)?;
    parse_schema(&text)
}

/// Serialize a schema back to the schema file layout.
pub fn schema_to_json(schema: &ConfigurationSchema) -> serde_json::Value {
    let numbers: Map<String, serde_json::Value> = schema
        .numbers
        .iter()
        .map(|d| (d.name.clone(), json!([d.min, d.max, d.precision])))
        .collect();
    let enums: Map<String, serde_json::Value> = schema
        .enums
        .iter()
        .map(|d| (d.name.clone(), json!(d.values)))
        .collect();
    json!({
        "booleans": schema.booleans,
        "numbers": numbers,
        "enums": enums,
        "choices": schema.choices,
    })
}

fn validate_schema(schema: &ConfigurationSchema) -> Result<(), SchemaError> {
    for domain in &schema.numbers {
        if !domain.min.is_finite() || !domain.max.is_finite() {
            return Err(SchemaError::InvalidNumber {
                name: domain.name.clone(),
                reason: "bounds must be finite".to_string(),
            });
        }
        if domain.min > domain.max {
            return Err(SchemaError::InvalidNumber {
                name: domain.name.clone(),
                reason: format!("min {} is greater than max {}", domain.min, domain.max),
            });
        }
        if domain.grid_bounds().is_none() {
            return Err(SchemaError::InvalidNumber {
                name: domain.name.clone(),
                reason: format!("no value at precision {} within bounds", domain.precision),
            });
        }
    }

    for domain in &schema.enums {
        if domain.values.is_empty() {
            return Err(SchemaError::EmptyEnum {
                name: domain.name.clone(),
            });
        }
    }

    for (index, group) in schema.choices.iter().enumerate() {
        if group.is_empty() {
            return Err(SchemaError::EmptyChoice { index });
        }
    }

    let mut seen = HashSet::new();
    for name in schema.variable_columns() {
        if !seen.insert(name.clone()) {
            return Err(SchemaError::Duplicate { name });
        }
    }

    Ok(())
}
