use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Names of the two measured columns appended after the configuration columns.
pub const NB_PAGES_COLUMN: &str = "nbPages";
pub const SPACE_COLUMN: &str = "space";

// ── Values ───────────────────────────────────────────────────────────

/// A concrete value assigned to one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

// ── Configurations ───────────────────────────────────────────────────

/// An assignment of values to variables. May be partial.
///
/// Uses BTreeMap so iteration (and therefore any derived output) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Replace the entry for `name` with `previous`: reinserts it when it was
    /// set, removes it otherwise.
    pub fn restore(&mut self, name: &str, previous: Option<Value>) {
        match previous {
            Some(value) => {
                self.values.insert(name.to_string(), value);
            }
            None => {
                self.values.remove(name);
            }
        }
    }
}

impl FromIterator<(String, Value)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// ── Schema ───────────────────────────────────────────────────────────

/// Numeric variable domain: `[min, max]` rounded to `precision` decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberDomain {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub precision: i32,
}

impl NumberDomain {
    /// Round `value` to the domain precision. Negative precisions round to
    /// tens, hundreds, ...
    pub fn round(&self, value: f64) -> f64 {
        round_to(value, self.precision)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Lowest and highest precision grid points inside `[min, max]`, or
    /// `None` when the range holds no grid point.
    pub fn grid_bounds(&self) -> Option<(f64, f64)> {
        let step = 10f64.powi(-self.precision);
        let mut lowest = self.round(self.min);
        if lowest < self.min {
            lowest = self.round(lowest + step);
        }
        let mut highest = self.round(self.max);
        if highest > self.max {
            highest = self.round(highest - step);
        }
        (lowest <= highest).then_some((lowest, highest))
    }
}

/// Round half away from zero to `precision` decimal digits.
pub fn round_to(value: f64, precision: i32) -> f64 {
    if precision >= 0 {
        let factor = 10f64.powi(precision);
        (value * factor).round() / factor
    } else {
        let step = 10f64.powi(-precision);
        (value / step).round() * step
    }
}

/// Enumerated variable domain, candidate strings in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDomain {
    pub name: String,
    pub values: Vec<String>,
}

/// Category a variable name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Boolean,
    Number,
    Enum,
    ChoiceMember,
}

/// Declared domains of every variable of a document.
///
/// Numbers and enums keep the order of the schema file: that order is the
/// column order of the sample table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationSchema {
    pub booleans: Vec<String>,
    pub numbers: Vec<NumberDomain>,
    pub enums: Vec<EnumDomain>,
    pub choices: Vec<Vec<String>>,
}

impl ConfigurationSchema {
    pub fn number(&self, name: &str) -> Option<&NumberDomain> {
        self.numbers.iter().find(|d| d.name == name)
    }

    pub fn enum_domain(&self, name: &str) -> Option<&EnumDomain> {
        self.enums.iter().find(|d| d.name == name)
    }

    /// Choice members flattened in group order.
    pub fn choice_members(&self) -> impl Iterator<Item = &String> {
        self.choices.iter().flatten()
    }

    /// Configuration columns: booleans, numbers, enums, then choice members.
    pub fn variable_columns(&self) -> Vec<String> {
        self.booleans
            .iter()
            .cloned()
            .chain(self.numbers.iter().map(|d| d.name.clone()))
            .chain(self.enums.iter().map(|d| d.name.clone()))
            .chain(self.choice_members().cloned())
            .collect()
    }

    /// Full sample table columns: the variable columns plus `nbPages` and `space`.
    pub fn table_columns(&self) -> Vec<String> {
        let mut columns = self.variable_columns();
        columns.push(NB_PAGES_COLUMN.to_string());
        columns.push(SPACE_COLUMN.to_string());
        columns
    }

    pub fn kind_of(&self, name: &str) -> Option<VariableKind> {
        if self.booleans.iter().any(|b| b == name) {
            Some(VariableKind::Boolean)
        } else if self.number(name).is_some() {
            Some(VariableKind::Number)
        } else if self.enum_domain(name).is_some() {
            Some(VariableKind::Enum)
        } else if self.choice_members().any(|m| m == name) {
            Some(VariableKind::ChoiceMember)
        } else {
            None
        }
    }

    /// Index of the choice group containing `member`.
    pub fn group_of(&self, member: &str) -> Option<usize> {
        self.choices
            .iter()
            .position(|group| group.iter().any(|m| m == member))
    }

    pub fn is_empty(&self) -> bool {
        self.booleans.is_empty()
            && self.numbers.is_empty()
            && self.enums.is_empty()
            && self.choices.is_empty()
    }
}
