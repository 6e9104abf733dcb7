//! Random configurations drawn from a schema.
//!
//! Every variable not present in `fixed` is drawn independently and
//! uniformly from its domain. Choice groups always come out with exactly one
//! member set.

use rand::seq::SliceRandom;
use rand::Rng;

use vary_ir::types::{Configuration, ConfigurationSchema, NumberDomain, Value};

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("fixed value for '{name}' is not a {expected}: {value}")]
    FixedValueKind {
        name: String,
        expected: &'static str,
        value: Value,
    },

    #[error("variable '{name}' has an empty domain")]
    EmptyDomain { name: String },
}

fn kind_error(name: &str, expected: &'static str, value: &Value) -> SampleError {
    SampleError::FixedValueKind {
        name: name.to_string(),
        expected,
        value: value.clone(),
    }
}

/// Draw a configuration for `schema`, keeping the values of `fixed`.
pub fn sample<R: Rng + ?Sized>(
    schema: &ConfigurationSchema,
    fixed: &Configuration,
    rng: &mut R,
) -> Result<Configuration, SampleError> {
    let mut config = Configuration::new();

    for name in &schema.booleans {
        let value = match fixed.get(name) {
            Some(v) => v.as_bool().ok_or_else(|| kind_error(name, "boolean", v))?,
            None => rng.gen_bool(0.5),
        };
        config.insert(name.clone(), value);
    }

    for domain in &schema.numbers {
        let value = match fixed.get(&domain.name) {
            Some(v) => v
                .as_number()
                .ok_or_else(|| kind_error(&domain.name, "number", v))?,
            None => draw_number(domain, rng),
        };
        config.insert(domain.name.clone(), value);
    }

    for domain in &schema.enums {
        let value = match fixed.get(&domain.name) {
            Some(v) => v
                .as_text()
                .ok_or_else(|| kind_error(&domain.name, "string", v))?
                .to_string(),
            None => domain
                .values
                .choose(rng)
                .cloned()
                .ok_or_else(|| SampleError::EmptyDomain {
                    name: domain.name.clone(),
                })?,
        };
        config.insert(domain.name.clone(), Value::Text(value));
    }

    for (index, group) in schema.choices.iter().enumerate() {
        let mut chosen = None;
        for member in group {
            if let Some(v) = fixed.get(member) {
                if v.as_bool().ok_or_else(|| kind_error(member, "boolean", v))? {
                    // Later fixed members override earlier ones.
                    chosen = Some(member);
                }
            }
        }
        let chosen = match chosen {
            Some(member) => member,
            None => group.choose(rng).ok_or_else(|| SampleError::EmptyDomain {
                name: format!("choice group {index}"),
            })?,
        };
        for member in group {
            config.insert(member.clone(), member == chosen);
        }
    }

    Ok(config)
}

/// [`sample`] with the thread-local generator. Not reproducible.
pub fn sample_random(
    schema: &ConfigurationSchema,
    fixed: &Configuration,
) -> Result<Configuration, SampleError> {
    sample(schema, fixed, &mut rand::thread_rng())
}

/// Uniform draw in `[min, max]`, rounded to the domain precision and kept
/// on the grid points lying inside the range. Schema validation rejects
/// ranges without a grid point; for those the rounded minimum is returned.
fn draw_number<R: Rng + ?Sized>(domain: &NumberDomain, rng: &mut R) -> f64 {
    let Some((lowest, highest)) = domain.grid_bounds() else {
        return domain.round(domain.min);
    };
    if lowest >= highest {
        return lowest;
    }
    let raw = rng.gen_range(domain.min..=domain.max);
    domain.round(raw).clamp(lowest, highest)
}
