//! Sample generation: draw a configuration, render it, measure the last
//! page and append the observation to the store.
//!
//! A render that times out, fails or yields no measurable gap drops its
//! sample; the batch carries on and the drop is counted in the report.
//! Nothing is retried.

use rand::Rng;
use rayon::prelude::*;

use vary_ir::types::{Configuration, ConfigurationSchema};
use vary_model::store::{Sample, SampleStore, StoreError};
use vary_sandbox::render::Renderer;

use crate::sampler::{sample, SampleError};
use crate::space::{measure, SpaceError, SpaceSource};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("sampling failed: {0}")]
    Sample(#[from] SampleError),

    #[error("sample store error: {0}")]
    Store(#[from] StoreError),
}

/// Counters of one generation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub generated: usize,
    pub timeouts: usize,
    pub degenerate: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn dropped(&self) -> usize {
        self.timeouts + self.degenerate + self.failed
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Measured(_) => self.generated += 1,
            Outcome::TimedOut => self.timeouts += 1,
            Outcome::Degenerate => self.degenerate += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

enum Outcome {
    Measured(Sample),
    TimedOut,
    Degenerate,
    Failed,
}

fn observe<R: Renderer + ?Sized>(
    renderer: &R,
    config: Configuration,
    source: SpaceSource,
    index: usize,
) -> Outcome {
    let doc = match renderer.render(&config) {
        Ok(doc) => doc,
        Err(err) if err.is_timeout() => {
            log::warn!("sample {index}: render timed out, dropped");
            return Outcome::TimedOut;
        }
        Err(err) => {
            log::warn!("sample {index}: render failed, dropped: {err}");
            return Outcome::Failed;
        }
    };

    match measure(&doc, source) {
        Ok(space) => Outcome::Measured(Sample {
            config,
            nb_pages: doc.page_count,
            space,
        }),
        Err(SpaceError::Degenerate) => {
            log::warn!("sample {index}: no measurable gap on the last page, dropped");
            Outcome::Degenerate
        }
        Err(err) => {
            log::warn!("sample {index}: {err}, dropped");
            Outcome::Failed
        }
    }
}

fn append_all(
    outcomes: Vec<Outcome>,
    store: &mut SampleStore,
    report: &mut BatchReport,
) -> Result<(), GenerateError> {
    for outcome in outcomes {
        report.record(&outcome);
        if let Outcome::Measured(sample) = outcome {
            store.append(sample)?;
        }
    }
    Ok(())
}

/// Generate `count` samples one after the other.
pub fn generate_batch<R: Renderer + ?Sized, G: Rng + ?Sized>(
    renderer: &R,
    schema: &ConfigurationSchema,
    fixed: &Configuration,
    count: usize,
    source: SpaceSource,
    store: &mut SampleStore,
    rng: &mut G,
) -> Result<BatchReport, GenerateError> {
    let mut report = BatchReport {
        requested: count,
        ..BatchReport::default()
    };
    for index in 0..count {
        let config = sample(schema, fixed, rng)?;
        let outcome = observe(renderer, config, source, index);
        append_all(vec![outcome], store, &mut report)?;
    }
    log::info!(
        "generated {}/{} samples ({} timed out, {} degenerate, {} failed)",
        report.generated,
        count,
        report.timeouts,
        report.degenerate,
        report.failed
    );
    Ok(report)
}

/// Generate `count` samples with renders spread over the rayon pool.
///
/// Configurations are drawn up front from `rng`; observations are appended
/// in draw order once every render has finished.
pub fn generate_parallel<R: Renderer + Sync + ?Sized, G: Rng + ?Sized>(
    renderer: &R,
    schema: &ConfigurationSchema,
    fixed: &Configuration,
    count: usize,
    source: SpaceSource,
    store: &mut SampleStore,
    rng: &mut G,
) -> Result<BatchReport, GenerateError> {
    let configs = (0..count)
        .map(|_| sample(schema, fixed, rng))
        .collect::<Result<Vec<_>, _>>()?;

    let outcomes: Vec<Outcome> = configs
        .into_par_iter()
        .enumerate()
        .map(|(index, config)| observe(renderer, config, source, index))
        .collect();

    let mut report = BatchReport {
        requested: count,
        ..BatchReport::default()
    };
    append_all(outcomes, store, &mut report)?;
    log::info!(
        "generated {}/{} samples in parallel ({} dropped)",
        report.generated,
        count,
        report.dropped()
    );
    Ok(report)
}
