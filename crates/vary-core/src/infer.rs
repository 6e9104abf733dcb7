//! Inference on partially specified configurations.
//!
//! A variable left out of the configuration is unknown: at a split on one
//! of its features both subtrees are walked and their leaf populations are
//! added up. Known features follow the split as usual (`v > threshold`
//! goes right). The probability of the target class is its share of the
//! collected population.
//!
//! Invariants:
//! - a configuration setting every variable reaches exactly one leaf
//! - the result only depends on the model and the configuration

use vary_ir::types::{Configuration, ConfigurationSchema, Value};
use vary_model::encode::{numeric_value, EncodeError, Feature, FeatureSpace};
use vary_model::train::TrainedModel;
use vary_model::tree::DecisionTree;

use crate::report::{BooleanReport, EnumReport, InferenceReport, Limit, NumberReport};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("the trained model has no feature for variable '{variable}'")]
    MissingFeature { variable: String },

    #[error("invalid value: {0}")]
    InvalidValue(#[from] EncodeError),

    #[error("model has {features} features but its tree splits on {tree}")]
    FeatureCount { features: usize, tree: usize },
}

/// Feature row of a partial configuration, `None` where unknown.
///
/// A set enumeration turns its own one-hot feature on and every sibling
/// off, including values the model never saw.
pub fn resolve(features: &FeatureSpace, partial: &Configuration) -> Result<Vec<Option<f64>>, InferenceError> {
    features
        .features()
        .iter()
        .map(|feature| match feature {
            Feature::Direct(name) => Ok(partial
                .get(name)
                .map(|v| numeric_value(name, v))
                .transpose()?),
            Feature::OneHot { variable, value } => Ok(partial
                .get(variable)
                .map(|current| if current.to_string() == *value { 1.0 } else { 0.0 })),
        })
        .collect()
}

/// Class population collected from every leaf compatible with `row`.
pub fn population(tree: &DecisionTree, row: &[Option<f64>]) -> Vec<f64> {
    let mut total = vec![0.0; tree.classes().len()];
    let mut stack = vec![0usize];
    while let Some(node) = stack.pop() {
        if tree.is_leaf(node) {
            for (acc, count) in total.iter_mut().zip(&tree.value()[node]) {
                *acc += count;
            }
            continue;
        }
        let left = tree.children_left()[node] as usize;
        let right = tree.children_right()[node] as usize;
        match row.get(tree.feature()[node] as usize).copied().flatten() {
            Some(v) if v > tree.threshold()[node] => stack.push(right),
            Some(_) => stack.push(left),
            None => {
                stack.push(right);
                stack.push(left);
            }
        }
    }
    total
}

/// Probability that `partial` ends up in class `target`. A class the tree
/// never saw has probability 0.
pub fn predict(model: &TrainedModel, partial: &Configuration, target: bool) -> Result<f64, InferenceError> {
    if model.features.len() != model.tree.n_features() {
        return Err(InferenceError::FeatureCount {
            features: model.features.len(),
            tree: model.tree.n_features(),
        });
    }
    let row = resolve(&model.features, partial)?;
    let Some(index) = model.tree.classes().iter().position(|&c| c == target) else {
        return Ok(0.0);
    };
    let counts = population(&model.tree, &row);
    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return Ok(0.0);
    }
    Ok(counts[index] / total)
}

/// Everything an inference needs, shareable across threads.
#[derive(Debug, Clone)]
pub struct InferenceContext {
    model: TrainedModel,
    schema: ConfigurationSchema,
    target: bool,
}

impl InferenceContext {
    pub fn new(model: TrainedModel, schema: ConfigurationSchema, target: bool) -> Self {
        Self { model, schema, target }
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn schema(&self) -> &ConfigurationSchema {
        &self.schema
    }

    pub fn target(&self) -> bool {
        self.target
    }

    pub fn predict(&self, partial: &Configuration) -> Result<f64, InferenceError> {
        predict(&self.model, partial, self.target)
    }

    /// Every schema variable must be represented in the feature space.
    fn check_features(&self) -> Result<(), InferenceError> {
        match self
            .schema
            .variable_columns()
            .into_iter()
            .find(|variable| !self.model.features.covers(variable))
        {
            Some(variable) => Err(InferenceError::MissingFeature { variable }),
            None => Ok(()),
        }
    }

    /// Probability of the target for each value of each variable, the rest
    /// of `config` unchanged, plus the probability with the variable unset.
    pub fn evaluate_options(&self, config: &Configuration) -> Result<InferenceReport, InferenceError> {
        self.check_features()?;
        let mut work = config.clone();
        let mut report = InferenceReport::default();

        for domain in &self.schema.enums {
            let name = &domain.name;
            let mut entry = EnumReport::default();
            for value in &domain.values {
                work.insert(name.clone(), Value::Text(value.clone()));
                entry.values.insert(value.clone(), self.predict(&work)?);
            }
            work.remove(name);
            entry.default = self.predict(&work)?;
            work.restore(name, config.get(name).cloned());
            report.enums.insert(name.clone(), entry);
        }

        for name in &self.schema.booleans {
            work.insert(name.clone(), true);
            let when_true = self.predict(&work)?;
            work.insert(name.clone(), false);
            let when_false = self.predict(&work)?;
            work.remove(name);
            let default = self.predict(&work)?;
            work.restore(name, config.get(name).cloned());
            report.booleans.insert(
                name.clone(),
                BooleanReport {
                    default,
                    when_true,
                    when_false,
                },
            );
        }

        for group in &self.schema.choices {
            for member in group {
                work.remove(member);
            }
            for member in group {
                work.insert(member.clone(), true);
                report.choices.insert(member.clone(), self.predict(&work)?);
                work.remove(member);
            }
            for member in group {
                work.restore(member, config.get(member).cloned());
            }
        }

        for domain in &self.schema.numbers {
            let name = &domain.name;
            let mut bounds = vec![domain.min, domain.max];
            if let Some(index) = self.model.features.direct_index(name) {
                bounds.extend(self.model.tree.thresholds_for(index));
            }
            bounds.sort_by(f64::total_cmp);
            bounds.dedup();

            let mut entry = NumberReport::default();
            for pair in bounds.windows(2) {
                let (lower, upper) = (pair[0], pair[1]);
                work.insert(name.clone(), (lower + upper) / 2.0);
                entry.limits.push(Limit {
                    lower,
                    upper,
                    prob: self.predict(&work)?,
                });
            }
            work.remove(name);
            entry.default = self.predict(&work)?;
            work.restore(name, config.get(name).cloned());
            report.numbers.insert(name.clone(), entry);
        }

        Ok(report)
    }
}
