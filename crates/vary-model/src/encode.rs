//! Feature space of the classifier.
//!
//! Booleans, numbers and choice members map to one feature each. An
//! enumeration becomes one 0/1 feature per value observed in the data,
//! named `<variable>_<value>`, values in sorted order. Features otherwise
//! follow the column order of the sample table.

use std::collections::BTreeSet;
use std::fmt;

use vary_ir::types::{Configuration, ConfigurationSchema, Value};

use crate::store::Sample;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("no value for feature '{feature}'")]
    Missing { feature: String },

    #[error("value {value} of '{feature}' is not numeric")]
    NotNumeric { feature: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    /// Column used as is.
    Direct(String),
    /// Indicator of `variable == value`.
    OneHot { variable: String, value: String },
}

impl Feature {
    /// Configuration variable this feature is derived from.
    pub fn variable(&self) -> &str {
        match self {
            Feature::Direct(name) => name,
            Feature::OneHot { variable, .. } => variable,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Direct(name) => f.write_str(name),
            Feature::OneHot { variable, value } => write!(f, "{variable}_{value}"),
        }
    }
}

/// Numeric reading of a direct value: booleans as 0/1, `"true"`/`"false"`
/// strings accepted.
pub fn numeric_value(feature: &str, value: &Value) -> Result<f64, EncodeError> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(*n),
        Value::Text(s) if s == "true" => Ok(1.0),
        Value::Text(s) if s == "false" => Ok(0.0),
        other => Err(EncodeError::NotNumeric {
            feature: feature.to_string(),
            value: other.clone(),
        }),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSpace {
    features: Vec<Feature>,
}

impl FeatureSpace {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Features for a table of `samples` drawn from `schema`.
    pub fn from_samples(schema: &ConfigurationSchema, samples: &[Sample]) -> Self {
        let mut features = Vec::new();
        for column in schema.variable_columns() {
            if schema.enum_domain(&column).is_some() {
                let observed: BTreeSet<String> = samples
                    .iter()
                    .filter_map(|s| s.config.get(&column))
                    .map(|v| v.to_string())
                    .collect();
                features.extend(observed.into_iter().map(|value| Feature::OneHot {
                    variable: column.clone(),
                    value,
                }));
            } else {
                features.push(Feature::Direct(column));
            }
        }
        Self { features }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn get(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(Feature::to_string).collect()
    }

    /// Index of the direct feature for `variable`.
    pub fn direct_index(&self, variable: &str) -> Option<usize> {
        self.features
            .iter()
            .position(|f| matches!(f, Feature::Direct(name) if name == variable))
    }

    /// Whether any feature derives from `variable`.
    pub fn covers(&self, variable: &str) -> bool {
        self.features.iter().any(|f| f.variable() == variable)
    }

    /// Encode a complete configuration into a feature row.
    pub fn encode(&self, config: &Configuration) -> Result<Vec<f64>, EncodeError> {
        self.features
            .iter()
            .map(|feature| match feature {
                Feature::Direct(name) => {
                    let value = config.get(name).ok_or_else(|| EncodeError::Missing {
                        feature: name.clone(),
                    })?;
                    numeric_value(name, value)
                }
                Feature::OneHot { variable, value } => {
                    let current = config.get(variable).ok_or_else(|| EncodeError::Missing {
                        feature: feature.to_string(),
                    })?;
                    Ok(if current.to_string() == *value { 1.0 } else { 0.0 })
                }
            })
            .collect()
    }
}
