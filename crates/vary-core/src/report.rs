//! Probabilities of reaching the target for every one-step change of a
//! partial configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceReport {
    pub enums: BTreeMap<String, EnumReport>,
    pub booleans: BTreeMap<String, BooleanReport>,
    /// Probability with each choice member selected.
    pub choices: BTreeMap<String, f64>,
    pub numbers: BTreeMap<String, NumberReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumReport {
    /// Probability with the variable left undecided.
    pub default: f64,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanReport {
    pub default: f64,
    #[serde(rename = "true")]
    pub when_true: f64,
    #[serde(rename = "false")]
    pub when_false: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberReport {
    pub default: f64,
    pub limits: Vec<Limit>,
}

/// Sub-interval of a numeric domain between two consecutive split points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub lower: f64,
    pub upper: f64,
    pub prob: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let mut report = InferenceReport::default();
        report.booleans.insert(
            "ACK".to_string(),
            BooleanReport {
                default: 0.4,
                when_true: 1.0,
                when_false: 0.0,
            },
        );
        report.numbers.insert(
            "size".to_string(),
            NumberReport {
                default: 0.5,
                limits: vec![Limit {
                    lower: 0.6,
                    upper: 0.9,
                    prob: 0.5,
                }],
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["booleans"]["ACK"]["true"], 1.0);
        assert_eq!(json["booleans"]["ACK"]["false"], 0.0);
        assert_eq!(json["numbers"]["size"]["limits"][0]["lower"], 0.6);
        assert!(json["enums"].as_object().unwrap().is_empty());
        assert!(json["choices"].as_object().unwrap().is_empty());
    }
}
